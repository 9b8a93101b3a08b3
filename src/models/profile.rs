// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meal-planning profile, one per user.
//!
//! Every preference is optional until the user sets it; a freshly
//! registered account starts with an entirely empty profile.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Diet {
    Anything,
    Vegetarian,
    Vegan,
    Ketogenic,
    Paleo,
    Pescetarian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    #[serde(rename = "VERYACTIVE")]
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Goal {
    #[serde(rename = "LOSEWEIGHT")]
    LoseWeight,
    Maintain,
    #[serde(rename = "GAINWEIGHT")]
    GainWeight,
}

/// Profile document stored in Firestore, keyed by the owning user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub diet: Option<Diet>,
    pub sex: Option<Sex>,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
    pub age: Option<u32>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub calories: Option<u32>,
    pub protein: Option<u32>,
    pub carbs: Option<u32>,
    pub fats: Option<u32>,
    pub intolerances: Option<Vec<String>>,
    pub favorite_cuisines: Option<Vec<String>>,
    pub meals_per_day: Option<u32>,
    pub created_at: String,
    pub updated_at: String,
}

impl Profile {
    /// Empty profile created atomically with a new user.
    pub fn empty(user_id: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            user_id: user_id.to_string(),
            diet: None,
            sex: None,
            activity_level: None,
            goal: None,
            age: None,
            height: None,
            weight: None,
            calories: None,
            protein: None,
            carbs: None,
            fats: None,
            intolerances: None,
            favorite_cuisines: None,
            meals_per_day: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Client-facing projection with internal/audit fields stripped.
    pub fn client_view(&self) -> ClientProfile {
        ClientProfile {
            diet: self.diet,
            sex: self.sex,
            activity_level: self.activity_level,
            goal: self.goal,
            age: self.age,
            height: self.height,
            weight: self.weight,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fats: self.fats,
            intolerances: self.intolerances.clone(),
            favorite_cuisines: self.favorite_cuisines.clone(),
            meals_per_day: self.meals_per_day,
        }
    }
}

/// Profile fields safe to return to the browser. Wire names are
/// camelCase to match the rest of the API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub diet: Option<Diet>,
    pub sex: Option<Sex>,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
    pub age: Option<u32>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub calories: Option<u32>,
    pub protein: Option<u32>,
    pub carbs: Option<u32>,
    pub fats: Option<u32>,
    pub intolerances: Option<Vec<String>>,
    pub favorite_cuisines: Option<Vec<String>>,
    pub meals_per_day: Option<u32>,
}

//! Meal domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Meal slot of a logged intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Coarse food classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FoodCategory {
    Staple,
    Meat,
    Veg,
    Drink,
    Snack,
}

/// Local sync lifecycle of a record.
///
/// `Pending` records are picked up by the next reconciliation cycle.
/// `Conflict` records are never resubmitted automatically; they wait for
/// record-level resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    Synced,
    Conflict,
}

/// A logged food intake event.
///
/// `local_id` is device-local and never transmitted as identity. `client_id`
/// is assigned exactly once at creation and is the only identifier safe for
/// correlating this record with its server counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub local_id: i32,
    pub client_id: String,
    pub server_id: Option<i64>,
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub sodium: f64,
    pub purine: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: MealType,
    pub category: FoodCategory,
    pub record_date: NaiveDate,
    pub note: Option<String>,
    pub image_url: Option<String>,
    pub ai_recognized: bool,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User-supplied fields for a new meal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealDraft {
    pub name: String,
    pub portion: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub sodium: f64,
    #[serde(default)]
    pub purine: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: MealType,
    pub category: FoodCategory,
    pub record_date: NaiveDate,
    pub note: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub ai_recognized: bool,
}

/// A fully prepared record ready for insertion into the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub client_id: String,
    pub draft: MealDraft,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewMeal {
    /// Stamp a draft for local-first insertion: fresh `client_id`, status
    /// `Pending`, both timestamps set to `now`.
    pub fn pending(draft: MealDraft, now: DateTime<Utc>) -> Self {
        Self {
            client_id: Uuid::new_v4().to_string(),
            draft,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an existing meal; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealUpdate {
    pub name: Option<String>,
    pub portion: Option<String>,
    pub calories: Option<f64>,
    pub sodium: Option<f64>,
    pub purine: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub meal_type: Option<MealType>,
    pub category: Option<FoodCategory>,
    pub note: Option<String>,
}

/// Aggregated intake for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_calories: f64,
    pub total_sodium: f64,
    pub total_purine: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub meal_count: usize,
}

impl DailySummary {
    /// Fold a day's records into totals. Absent macro values count as zero.
    pub fn from_meals(date: NaiveDate, meals: &[Meal]) -> Self {
        let mut summary = Self {
            date,
            total_calories: 0.0,
            total_sodium: 0.0,
            total_purine: 0.0,
            total_protein: 0.0,
            total_carbs: 0.0,
            total_fat: 0.0,
            meal_count: 0,
        };
        for meal in meals {
            summary.total_calories += meal.calories;
            summary.total_sodium += meal.sodium;
            summary.total_purine += meal.purine;
            summary.total_protein += meal.protein.unwrap_or(0.0);
            summary.total_carbs += meal.carbs.unwrap_or(0.0);
            summary.total_fat += meal.fat.unwrap_or(0.0);
            summary.meal_count += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(calories: f64, protein: Option<f64>) -> Meal {
        let now = Utc::now();
        Meal {
            local_id: 1,
            client_id: Uuid::new_v4().to_string(),
            server_id: None,
            name: "rice".to_string(),
            portion: "1 bowl".to_string(),
            calories,
            sodium: 2.0,
            purine: 20.0,
            protein,
            carbs: None,
            fat: None,
            fiber: None,
            meal_type: MealType::Lunch,
            category: FoodCategory::Staple,
            record_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            note: None,
            image_url: None,
            ai_recognized: false,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_serialization_matches_backend_contract() {
        let actual = [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Conflict]
            .iter()
            .map(|status| serde_json::to_string(status).expect("serialize sync status"))
            .collect::<Vec<_>>();
        assert_eq!(actual, vec!["\"PENDING\"", "\"SYNCED\"", "\"CONFLICT\""]);

        let meal_type: MealType = serde_json::from_str("\"BREAKFAST\"").expect("meal type");
        assert_eq!(meal_type, MealType::Breakfast);
        let category: FoodCategory = serde_json::from_str("\"STAPLE\"").expect("category");
        assert_eq!(category, FoodCategory::Staple);
    }

    #[test]
    fn daily_summary_treats_missing_macros_as_zero() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let meals = vec![meal(300.0, Some(10.0)), meal(150.0, None)];
        let summary = DailySummary::from_meals(date, &meals);
        assert_eq!(summary.meal_count, 2);
        assert_eq!(summary.total_calories, 450.0);
        assert_eq!(summary.total_protein, 10.0);
    }

    #[test]
    fn pending_seed_assigns_unique_client_ids() {
        let draft = MealDraft {
            name: "tofu".to_string(),
            portion: "100g".to_string(),
            calories: 80.0,
            sodium: 5.0,
            purine: 30.0,
            protein: Some(8.0),
            carbs: None,
            fat: None,
            fiber: None,
            meal_type: MealType::Dinner,
            category: FoodCategory::Veg,
            record_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            note: None,
            image_url: None,
            ai_recognized: false,
        };
        let now = Utc::now();
        let a = NewMeal::pending(draft.clone(), now);
        let b = NewMeal::pending(draft, now);
        assert_ne!(a.client_id, b.client_id);
        assert_eq!(a.sync_status, SyncStatus::Pending);
        assert_eq!(a.created_at, a.updated_at);
    }
}

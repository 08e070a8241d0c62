//! Entity kinds and their typed creation payloads.
//!
//! Every record the app can create while offline belongs to one of the
//! backend collections below. Payloads are a tagged union so a staged
//! record always carries the exact shape its kind's create endpoint
//! expects, rather than an untyped field map.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Backend collections that offline-created records can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Meal,
    BudgetEntry,
    GroceryAnalysis,
    ChildRecommendation,
}

impl EntityKind {
    /// All kinds, in the order the staging store scans them.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::User,
        EntityKind::Meal,
        EntityKind::BudgetEntry,
        EntityKind::GroceryAnalysis,
        EntityKind::ChildRecommendation,
    ];

    /// POST path that creates a record of this kind.
    pub fn create_path(&self) -> &'static str {
        match self {
            EntityKind::User => "/auth/register",
            EntityKind::Meal => "/meals",
            EntityKind::BudgetEntry => "/budget-entries",
            EntityKind::GroceryAnalysis => "/grocery-analyses",
            EntityKind::ChildRecommendation => "/child-recommendations",
        }
    }

    /// GET path whose listing staged records of this kind can substitute
    /// for while the backend is unreachable. Users have no list fallback;
    /// the admin console is online-only.
    pub fn list_path(&self) -> Option<&'static str> {
        match self {
            EntityKind::User => None,
            EntityKind::Meal => Some("/meals"),
            EntityKind::BudgetEntry => Some("/budget-entries"),
            EntityKind::GroceryAnalysis => Some("/grocery-analyses"),
            EntityKind::ChildRecommendation => Some("/child-recommendations"),
        }
    }

    /// Kind whose staged records substitute for a GET on `path`, if any.
    pub fn for_list_path(path: &str) -> Option<EntityKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.list_path() == Some(path))
    }

    /// Suffix of the well-known storage key this kind's records live under.
    pub fn storage_suffix(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Meal => "meals",
            EntityKind::BudgetEntry => "budget_entries",
            EntityKind::GroceryAnalysis => "grocery_analyses",
            EntityKind::ChildRecommendation => "child_recommendations",
        }
    }
}

/// Meal slot within a planned day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Offline registration payload; replayed through the register endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// A planned meal with its nutrition figures and cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPayload {
    pub name: String,
    pub meal_type: MealType,
    pub planned_for: NaiveDate,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub cost: Decimal,
}

/// One line of the grocery/food budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEntryPayload {
    pub category: String,
    pub label: String,
    pub amount: Decimal,
    pub spent_on: NaiveDate,
    pub note: Option<String>,
}

/// One purchased item inside a grocery analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: Decimal,
}

/// A priced breakdown of one grocery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryAnalysisPayload {
    pub store: Option<String>,
    pub analyzed_on: NaiveDate,
    pub items: Vec<GroceryItem>,
    pub total_cost: Decimal,
}

/// Nutrition recommendation computed for one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRecommendationPayload {
    pub child_name: String,
    pub age_months: i32,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub daily_calories: i32,
    pub summary: String,
}

/// Typed union over the known entity kinds.
///
/// The tag travels with the payload so a persisted record deserializes
/// back into the right variant without consulting its surrounding key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityPayload {
    User(UserPayload),
    Meal(MealPayload),
    BudgetEntry(BudgetEntryPayload),
    GroceryAnalysis(GroceryAnalysisPayload),
    ChildRecommendation(ChildRecommendationPayload),
}

impl EntityPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::User(_) => EntityKind::User,
            EntityPayload::Meal(_) => EntityKind::Meal,
            EntityPayload::BudgetEntry(_) => EntityKind::BudgetEntry,
            EntityPayload::GroceryAnalysis(_) => EntityKind::GroceryAnalysis,
            EntityPayload::ChildRecommendation(_) => EntityKind::ChildRecommendation,
        }
    }

    /// Default natural key used for staging identity. Re-staging the same
    /// key overwrites the prior staged entry rather than duplicating it.
    pub fn natural_key(&self) -> String {
        match self {
            EntityPayload::User(p) => p.email.clone(),
            EntityPayload::Meal(p) => format!("{}:{}", p.planned_for, p.name),
            EntityPayload::BudgetEntry(p) => {
                format!("{}:{}:{}", p.spent_on, p.category, p.label)
            }
            EntityPayload::GroceryAnalysis(p) => format!(
                "{}:{}",
                p.analyzed_on,
                p.store.as_deref().unwrap_or("unknown")
            ),
            EntityPayload::ChildRecommendation(p) => p.child_name.clone(),
        }
    }

    /// Body sent to the kind's create endpoint (inner payload only; the
    /// union tag is a local storage concern the backend never sees).
    pub fn to_create_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            EntityPayload::User(p) => serde_json::to_value(p),
            EntityPayload::Meal(p) => serde_json::to_value(p),
            EntityPayload::BudgetEntry(p) => serde_json::to_value(p),
            EntityPayload::GroceryAnalysis(p) => serde_json::to_value(p),
            EntityPayload::ChildRecommendation(p) => serde_json::to_value(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_meal() -> EntityPayload {
        EntityPayload::Meal(MealPayload {
            name: "Lentil soup".to_string(),
            meal_type: MealType::Dinner,
            planned_for: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            calories: 520,
            protein_g: 24.0,
            carbs_g: 61.5,
            fat_g: 14.2,
            cost: dec!(3.50),
        })
    }

    #[test]
    fn entity_kind_serialization_matches_backend_contract() {
        let actual = EntityKind::ALL
            .iter()
            .map(|kind| serde_json::to_string(kind).expect("serialize entity kind"))
            .collect::<Vec<_>>();

        let expected = vec![
            "\"user\"",
            "\"meal\"",
            "\"budget_entry\"",
            "\"grocery_analysis\"",
            "\"child_recommendation\"",
        ];

        assert_eq!(actual, expected);
    }

    #[test]
    fn list_path_lookup_is_inverse_of_list_path() {
        for kind in EntityKind::ALL {
            if let Some(path) = kind.list_path() {
                assert_eq!(EntityKind::for_list_path(path), Some(kind));
            }
        }
        assert_eq!(EntityKind::for_list_path("/auth/register"), None);
    }

    #[test]
    fn create_body_omits_union_tag() {
        let body = sample_meal().to_create_body().expect("create body");
        let object = body.as_object().expect("object body");
        assert!(!object.contains_key("kind"));
        assert_eq!(object["name"], "Lentil soup");
        assert_eq!(object["mealType"], "dinner");
    }

    #[test]
    fn payload_round_trips_through_tagged_json() {
        let payload = sample_meal();
        let json = serde_json::to_string(&payload).expect("serialize");
        assert!(json.contains("\"kind\":\"meal\""));
        let back: EntityPayload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, payload);
    }

    #[test]
    fn natural_keys_identify_records() {
        let user = EntityPayload::User(UserPayload {
            email: "a@x.com".to_string(),
            name: "Ada".to_string(),
            password: "secret".to_string(),
        });
        assert_eq!(user.natural_key(), "a@x.com");
        assert_eq!(sample_meal().natural_key(), "2026-03-02:Lentil soup");
    }
}

use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

pub const CUISINE: &str = "Italian";
pub const AGENT_VOLTAGENT: &str = "voltagent";
pub const AGENT_MOCK_FALLBACK: &str = "mock_fallback";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn label_ja(self) -> &'static str {
        match self {
            Difficulty::Easy => "簡単",
            Difficulty::Medium => "普通",
            Difficulty::Hard => "難しい",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VariationType {
    Vegetarian,
    Vegan,
    GlutenFree,
    Spicy,
    Creamy,
    Light,
}

impl VariationType {
    pub const ALL: [VariationType; 6] = [
        VariationType::Vegetarian,
        VariationType::Vegan,
        VariationType::GlutenFree,
        VariationType::Spicy,
        VariationType::Creamy,
        VariationType::Light,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VariationType::Vegetarian => "vegetarian",
            VariationType::Vegan => "vegan",
            VariationType::GlutenFree => "gluten-free",
            VariationType::Spicy => "spicy",
            VariationType::Creamy => "creamy",
            VariationType::Light => "light",
        }
    }

    pub fn label_ja(self) -> &'static str {
        match self {
            VariationType::Vegetarian => "ベジタリアン",
            VariationType::Vegan => "ビーガン",
            VariationType::GlutenFree => "グルテンフリー",
            VariationType::Spicy => "スパイシー",
            VariationType::Creamy => "クリーミー",
            VariationType::Light => "ライト",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryRestriction {
    Vegetarian,
    Vegan,
    GlutenFree,
}

impl DietaryRestriction {
    pub fn label_ja(self) -> &'static str {
        match self {
            DietaryRestriction::Vegetarian => VariationType::Vegetarian.label_ja(),
            DietaryRestriction::Vegan => VariationType::Vegan.label_ja(),
            DietaryRestriction::GlutenFree => VariationType::GlutenFree.label_ja(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_restrictions: Vec<DietaryRestriction>,
}

/// A single form submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub include_variations: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_variations: Vec<VariationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl RecipeRequest {
    /// Trims ingredients and drops blank ones, and empties the requested
    /// variations unless variations were asked for.
    pub fn normalized(mut self) -> Self {
        self.ingredients = self
            .ingredients
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect();

        if self.include_variations {
            let mut seen = Vec::with_capacity(self.requested_variations.len());
            for v in self.requested_variations {
                if !seen.contains(&v) {
                    seen.push(v);
                }
            }
            self.requested_variations = seen;
        } else {
            self.requested_variations.clear();
        }

        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.preferences
            .as_ref()
            .map(|p| p.difficulty)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub amount: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainRecipe {
    #[serde(default, deserialize_with = "lenient::string")]
    pub recipe_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub instructions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::minutes")]
    pub cooking_time: u32,
    #[serde(default, deserialize_with = "lenient::string")]
    pub difficulty: String,
    #[serde(default, deserialize_with = "lenient::minutes")]
    pub servings: u32,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub tips: Vec<String>,
    #[serde(default = "default_cuisine", deserialize_with = "lenient::string")]
    pub cuisine: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub region: Option<String>,
    #[serde(
        rename = "wine_pairing",
        alias = "winePairing",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub wine_pairing: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariationIngredient {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub amount: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub unit: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::flag"
    )]
    pub substitution: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    #[serde(default, deserialize_with = "lenient::string")]
    pub original: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub replacement: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeVariation {
    #[serde(default, deserialize_with = "lenient::string")]
    pub variation_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub modification_type: String,
    #[serde(default)]
    pub ingredients: Vec<VariationIngredient>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub nutritional_benefits: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub difficulty: String,
    #[serde(default, deserialize_with = "lenient::minutes")]
    pub cooking_time: u32,
    #[serde(default = "default_cuisine", deserialize_with = "lenient::string")]
    pub cuisine: String,
}

/// A reply that carries one variation of an existing recipe instead of a
/// full recipe response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationResponse {
    #[serde(default, deserialize_with = "lenient::string")]
    pub original_recipe: String,
    #[serde(flatten)]
    pub variation: RecipeVariation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = lenient::string(d)?;
        Ok(match raw.trim().to_lowercase().as_str() {
            "high" | "高" => Priority::High,
            "low" | "低" => Priority::Low,
            _ => Priority::Medium,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Addition {
    pub ingredient: String,
    pub reason: String,
    pub priority: Priority,
}

impl<'de> Deserialize<'de> for Addition {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Full {
            #[serde(default, deserialize_with = "lenient::string")]
            ingredient: String,
            #[serde(default, deserialize_with = "lenient::string")]
            reason: String,
            #[serde(default)]
            priority: Priority,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Bare(String),
            Full(Full),
        }

        Ok(match Shape::deserialize(d)? {
            Shape::Bare(ingredient) => Addition {
                ingredient,
                reason: String::new(),
                priority: Priority::Medium,
            },
            Shape::Full(f) => Addition {
                ingredient: f.ingredient,
                reason: f.reason,
                priority: f.priority,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalSuggestion {
    #[serde(default, deserialize_with = "lenient::string")]
    pub region: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub dish_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientAnalysis {
    #[serde(default, deserialize_with = "lenient::string")]
    pub compatibility: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub suggested_dish_types: Vec<String>,
    #[serde(default)]
    pub recommended_additions: Vec<Addition>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub difficulty_assessment: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub cooking_methods: Vec<String>,
    #[serde(default)]
    pub regional_suggestions: Vec<RegionalSuggestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, deserialize_with = "lenient::string")]
    pub generated_at: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub language: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub format: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub workflow_version: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub agent_used: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub fallback_reason: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub conversation_id: Option<String>,
}

impl Metadata {
    pub fn now(agent_used: &str, conversation_id: Option<String>) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            language: "ja".to_string(),
            format: "JSON".to_string(),
            workflow_version: "1.0".to_string(),
            agent_used: Some(agent_used.to_string()),
            fallback_reason: None,
            conversation_id,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.agent_used.as_deref() == Some(AGENT_MOCK_FALLBACK)
    }
}

/// Full reply shape: a main recipe plus optional variations and analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResponse {
    pub main_recipe: MainRecipe,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<RecipeVariation>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_none"
    )]
    pub ingredient_analysis: Option<IngredientAnalysis>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::or_none"
    )]
    pub metadata: Option<Metadata>,
}

fn default_cuisine() -> String {
    CUISINE.to_string()
}

// Model output drifts from the requested schema: numbers arrive as strings
// ("30分"), strings as numbers, single values where lists were asked for.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar(v: Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar(Value::deserialize(d)?).filter(|s| !s.trim().is_empty()))
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().filter_map(scalar).collect(),
            other => scalar(other).into_iter().collect(),
        })
    }

    /// Side blocks that do not match their schema are dropped rather than
    /// failing the whole reply.
    pub fn or_none<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(Value::deserialize(d)?).ok())
    }

    /// Accepts `30`, `30.0`, `"30"`, `"30分"` and `"約30分"`; the first run of
    /// digits wins. Anything else reads as 0.
    pub fn minutes<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            Value::String(s) => {
                let digits: String = s
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                digits.parse().unwrap_or(0)
            }
            _ => 0,
        })
    }

    /// `true`/`false`, or a substitution reason string (non-empty means true).
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => Some(!s.trim().is_empty()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalized_drops_blank_ingredients_and_keeps_order() {
        let req = RecipeRequest {
            ingredients: vec![" tomato ".into(), "".into(), "   ".into(), "basil".into()],
            ..Default::default()
        }
        .normalized();

        assert_eq!(req.ingredients, vec!["tomato", "basil"]);
    }

    #[test]
    fn normalized_clears_variations_when_not_requested() {
        let req = RecipeRequest {
            ingredients: vec!["pasta".into()],
            include_variations: false,
            requested_variations: vec![VariationType::Vegan, VariationType::Spicy],
            ..Default::default()
        }
        .normalized();

        assert!(req.requested_variations.is_empty());
    }

    #[test]
    fn normalized_dedupes_requested_variations() {
        let req = RecipeRequest {
            ingredients: vec!["pasta".into()],
            include_variations: true,
            requested_variations: vec![
                VariationType::Vegan,
                VariationType::Light,
                VariationType::Vegan,
            ],
            ..Default::default()
        }
        .normalized();

        assert_eq!(
            req.requested_variations,
            vec![VariationType::Vegan, VariationType::Light]
        );
    }

    #[test]
    fn request_parses_camel_case_form_body() {
        let req: RecipeRequest = serde_json::from_value(json!({
            "ingredients": ["tomato", "basil"],
            "preferences": {"difficulty": "easy", "servings": 2, "dietaryRestrictions": ["gluten-free"]},
            "includeVariations": true,
            "requestedVariations": ["gluten-free", "creamy"]
        }))
        .unwrap();

        let prefs = req.preferences.unwrap();
        assert_eq!(prefs.difficulty, Difficulty::Easy);
        assert_eq!(prefs.servings, Some(2));
        assert_eq!(prefs.cooking_time, None);
        assert_eq!(prefs.dietary_restrictions, vec![DietaryRestriction::GlutenFree]);
        assert_eq!(
            req.requested_variations,
            vec![VariationType::GlutenFree, VariationType::Creamy]
        );
    }

    #[test]
    fn main_recipe_tolerates_model_drift() {
        let recipe: MainRecipe = serde_json::from_value(json!({
            "recipeName": "カプレーゼ",
            "ingredients": [{"name": "トマト", "amount": 2, "unit": "個"}],
            "instructions": "切って並べる",
            "cookingTime": "10分",
            "servings": 2.0,
            "winePairing": "ソアーヴェ",
            "region": ""
        }))
        .unwrap();

        assert_eq!(recipe.ingredients[0].amount, "2");
        assert_eq!(recipe.instructions, vec!["切って並べる"]);
        assert_eq!(recipe.cooking_time, 10);
        assert_eq!(recipe.servings, 2);
        assert_eq!(recipe.cuisine, CUISINE);
        assert_eq!(recipe.wine_pairing.as_deref(), Some("ソアーヴェ"));
        assert_eq!(recipe.region, None);
    }

    #[test]
    fn additions_accept_bare_strings_and_japanese_priorities() {
        let analysis: IngredientAnalysis = serde_json::from_value(json!({
            "compatibility": "高",
            "recommendedAdditions": [
                "オリーブオイル",
                {"ingredient": "にんにく", "reason": "香り付け", "priority": "高"},
                {"ingredient": "ケッパー", "reason": "酸味", "priority": "low"}
            ]
        }))
        .unwrap();

        let priorities: Vec<Priority> = analysis
            .recommended_additions
            .iter()
            .map(|a| a.priority)
            .collect();
        assert_eq!(priorities, vec![Priority::Medium, Priority::High, Priority::Low]);
        assert_eq!(analysis.recommended_additions[0].ingredient, "オリーブオイル");
    }

    #[test]
    fn substitution_flag_accepts_reason_strings() {
        let ing: VariationIngredient = serde_json::from_value(json!({
            "name": "豆腐", "amount": "100", "unit": "g", "substitution": "チーズの代わり"
        }))
        .unwrap();
        assert_eq!(ing.substitution, Some(true));
    }

    #[test]
    fn minutes_take_first_digit_run_anywhere() {
        let recipe: MainRecipe = serde_json::from_value(json!({
            "cookingTime": "約30分",
            "servings": "2〜3人分"
        }))
        .unwrap();

        assert_eq!(recipe.cooking_time, 30);
        assert_eq!(recipe.servings, 2);
    }

    #[test]
    fn loose_metadata_does_not_sink_the_recipe() {
        let resp: RecipeResponse = serde_json::from_value(json!({
            "mainRecipe": {"recipeName": "A"},
            "metadata": {"generated_at": null, "language": "ja", "workflow_version": 1.0}
        }))
        .unwrap();

        let meta = resp.metadata.unwrap();
        assert_eq!(meta.workflow_version, "1.0");
        assert_eq!(meta.generated_at, "");
    }

    #[test]
    fn malformed_side_blocks_are_dropped() {
        let resp: RecipeResponse = serde_json::from_value(json!({
            "mainRecipe": {"recipeName": "A"},
            "ingredientAnalysis": "特になし",
            "metadata": ["not", "an", "object"]
        }))
        .unwrap();

        assert_eq!(resp.main_recipe.recipe_name, "A");
        assert_eq!(resp.ingredient_analysis, None);
        assert_eq!(resp.metadata, None);
    }

    #[test]
    fn cli_names_match_wire_names() {
        for v in VariationType::ALL {
            let name = v.to_possible_value().unwrap();
            assert_eq!(name.get_name(), v.as_str());
        }
        assert_eq!(Difficulty::from_str("hard", false), Ok(Difficulty::Hard));
    }
}

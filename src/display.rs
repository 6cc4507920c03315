use serde::{Deserialize, Serialize};

use crate::extract::AgentPayload;
use crate::fallback::DEFAULT_COOKING_TIME;
use crate::recipe::{
    Ingredient, IngredientAnalysis, MainRecipe, Metadata, RecipeResponse, RecipeVariation,
    Substitution, VariationIngredient, VariationResponse,
};

/// Variation replies carry no serving count; also used when a full reply
/// leaves it out.
pub const VARIATION_SERVINGS: u32 = 2;

/// What the client renders. `substitutions` and `nutritionalBenefits` are
/// only set when the agent answered with a single variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecipe {
    pub main_recipe: MainRecipe,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<RecipeVariation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient_analysis: Option<IngredientAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitutions: Option<Vec<Substitution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutritional_benefits: Option<String>,
    pub metadata: Metadata,
}

impl DisplayRecipe {
    pub fn is_fallback(&self) -> bool {
        self.metadata.is_fallback()
    }
}

/// Maps either reply shape onto the display model. `metadata` is used when
/// the payload brought none of its own.
pub fn normalize(payload: AgentPayload, metadata: Metadata) -> DisplayRecipe {
    let mut display = match payload {
        AgentPayload::Full(resp) => from_full(resp, metadata),
        AgentPayload::Variation(resp) => from_variation(resp, metadata),
    };

    fill_missing_counts(&mut display);
    localize_units(&mut display);
    display
}

// Cooking time and servings are always positive in the display model.
fn fill_missing_counts(display: &mut DisplayRecipe) {
    let main = &mut display.main_recipe;
    if main.servings == 0 {
        main.servings = VARIATION_SERVINGS;
    }
    if main.cooking_time == 0 {
        main.cooking_time = DEFAULT_COOKING_TIME;
    }
    for variation in &mut display.variations {
        if variation.cooking_time == 0 {
            variation.cooking_time = main.cooking_time;
        }
    }
}

fn from_full(resp: RecipeResponse, metadata: Metadata) -> DisplayRecipe {
    let metadata = match resp.metadata {
        Some(theirs) => Metadata {
            agent_used: metadata.agent_used,
            fallback_reason: metadata.fallback_reason,
            conversation_id: metadata.conversation_id,
            ..theirs
        },
        None => metadata,
    };

    DisplayRecipe {
        main_recipe: resp.main_recipe,
        variations: resp.variations,
        ingredient_analysis: resp.ingredient_analysis,
        substitutions: None,
        nutritional_benefits: None,
        metadata,
    }
}

fn from_variation(resp: VariationResponse, metadata: Metadata) -> DisplayRecipe {
    let v = resp.variation;
    let description = format!("{}の{}バージョン", resp.original_recipe, v.modification_type);

    let main_recipe = MainRecipe {
        recipe_name: v.variation_name,
        description,
        ingredients: v.ingredients.into_iter().map(plain_ingredient).collect(),
        instructions: v.instructions,
        cooking_time: v.cooking_time,
        difficulty: v.difficulty,
        servings: VARIATION_SERVINGS,
        tips: Vec::new(),
        cuisine: v.cuisine,
        region: None,
        wine_pairing: None,
    };

    DisplayRecipe {
        main_recipe,
        variations: Vec::new(),
        ingredient_analysis: None,
        substitutions: Some(v.substitutions),
        nutritional_benefits: v.nutritional_benefits,
        metadata,
    }
}

fn plain_ingredient(i: VariationIngredient) -> Ingredient {
    Ingredient {
        name: i.name,
        amount: i.amount,
        unit: i.unit,
    }
}

fn localize_units(display: &mut DisplayRecipe) {
    for ing in &mut display.main_recipe.ingredients {
        ing.unit = localize_unit(&ing.unit);
    }
    for variation in &mut display.variations {
        for ing in &mut variation.ingredients {
            ing.unit = localize_unit(&ing.unit);
        }
    }
}

/// Maps English kitchen units to their Japanese names. Metric units and
/// anything unrecognized are returned unchanged.
pub fn localize_unit(unit: &str) -> String {
    let trimmed = unit.trim();
    let key = trimmed.trim_end_matches('.').to_lowercase();

    let ja = match key.as_str() {
        "tbsp" | "tbs" | "tablespoon" | "tablespoons" => "大さじ",
        "tsp" | "teaspoon" | "teaspoons" => "小さじ",
        "cup" | "cups" => "カップ",
        "clove" | "cloves" => "かけ",
        "piece" | "pieces" | "pc" | "pcs" => "個",
        "slice" | "slices" => "枚",
        "pinch" | "dash" => "少々",
        "to taste" => "適量",
        "gram" | "grams" => "g",
        "milliliter" | "milliliters" | "millilitre" | "millilitres" => "ml",
        "liter" | "liters" | "litre" | "litres" => "L",
        _ => return trimmed.to_string(),
    };
    ja.to_string()
}

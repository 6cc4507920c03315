//! Deterministic stand-in recipe for when the agent is unavailable or its
//! reply cannot be used.

use crate::display::DisplayRecipe;
use crate::recipe::{
    Addition, Ingredient, IngredientAnalysis, MainRecipe, Metadata, Priority, RecipeRequest,
    RecipeVariation, RegionalSuggestion, Substitution, VariationIngredient, VariationType,
    AGENT_MOCK_FALLBACK, CUISINE,
};

pub const DEFAULT_COOKING_TIME: u32 = 30;
const DEFAULT_SERVINGS: u32 = 2;

/// Builds a spaghetti recipe around the requested ingredients. Never fails.
pub fn generate(req: &RecipeRequest, reason: &str) -> DisplayRecipe {
    let prefs = req.preferences.clone().unwrap_or_default();
    let cooking_time = prefs.cooking_time.filter(|t| *t > 0).unwrap_or(DEFAULT_COOKING_TIME);
    let servings = prefs.servings.filter(|s| *s > 0).unwrap_or(DEFAULT_SERVINGS);
    let difficulty = prefs.difficulty.label_ja().to_string();
    let joined = req.ingredients.join("、");

    let mut ingredients = vec![ingredient("スパゲッティ", &(100 * servings).to_string(), "g")];
    ingredients.extend(req.ingredients.iter().map(|name| ingredient(name, "適量", "")));
    ingredients.extend([
        ingredient("オリーブオイル", "2", "大さじ"),
        ingredient("にんにく", "1", "かけ"),
        ingredient("塩", "少々", ""),
    ]);

    let main_recipe = MainRecipe {
        recipe_name: format!("{joined}のスパゲッティ"),
        description: format!("{joined}を使ったシンプルなイタリアンパスタです。"),
        ingredients,
        instructions: vec![
            "たっぷりのお湯に塩を入れ、スパゲッティを表示時間より1分短く茹でる".to_string(),
            "フライパンにオリーブオイルとつぶしたにんにくを入れ、弱火で香りを出す".to_string(),
            format!("{joined}を加えて中火で炒める"),
            "茹で上がったスパゲッティと茹で汁少々を加えて手早く和える".to_string(),
            "塩で味を調えて器に盛る".to_string(),
        ],
        cooking_time,
        difficulty: difficulty.clone(),
        servings,
        tips: vec![
            "茹で汁を少し加えるとソースがよく絡みます".to_string(),
            "にんにくは焦がさないように弱火で".to_string(),
        ],
        cuisine: CUISINE.to_string(),
        region: None,
        wine_pairing: None,
    };

    let variations = if req.include_variations && !req.requested_variations.is_empty() {
        vec![vegetarian_variation(&main_recipe)]
    } else {
        Vec::new()
    };

    let mut metadata = Metadata::now(AGENT_MOCK_FALLBACK, req.conversation_id.clone());
    metadata.fallback_reason = Some(reason.to_string());

    DisplayRecipe {
        ingredient_analysis: Some(analysis(req, difficulty)),
        main_recipe,
        variations,
        substitutions: None,
        nutritional_benefits: None,
        metadata,
    }
}

fn ingredient(name: &str, amount: &str, unit: &str) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        amount: amount.to_string(),
        unit: unit.to_string(),
    }
}

fn vegetarian_variation(main: &MainRecipe) -> RecipeVariation {
    let label = VariationType::Vegetarian.label_ja();

    RecipeVariation {
        variation_name: format!("{}（{label}）", main.recipe_name),
        modification_type: label.to_string(),
        ingredients: main
            .ingredients
            .iter()
            .map(|i| VariationIngredient {
                name: i.name.clone(),
                amount: i.amount.clone(),
                unit: i.unit.clone(),
                substitution: Some(false),
            })
            .collect(),
        instructions: main.instructions.clone(),
        substitutions: vec![Substitution {
            original: "パルミジャーノ".to_string(),
            replacement: "ナッツ入りパン粉".to_string(),
            reason: "動物性レンネットを避けつつ香ばしさを加えるため".to_string(),
        }],
        nutritional_benefits: Some("野菜中心で食物繊維が豊富です".to_string()),
        difficulty: main.difficulty.clone(),
        cooking_time: main.cooking_time,
        cuisine: CUISINE.to_string(),
    }
}

fn analysis(req: &RecipeRequest, difficulty: String) -> IngredientAnalysis {
    let compatibility = if req.ingredients.len() >= 3 { "高" } else { "中" };

    IngredientAnalysis {
        compatibility: compatibility.to_string(),
        suggested_dish_types: vec!["パスタ".into(), "リゾット".into(), "ピッツァ".into()],
        recommended_additions: vec![
            Addition {
                ingredient: "オリーブオイル".into(),
                reason: "イタリア料理の基本となる風味".into(),
                priority: Priority::High,
            },
            Addition {
                ingredient: "にんにく".into(),
                reason: "香りとコクを加える".into(),
                priority: Priority::Medium,
            },
            Addition {
                ingredient: "バジル".into(),
                reason: "爽やかな香りで仕上げる".into(),
                priority: Priority::Low,
            },
        ],
        difficulty_assessment: difficulty,
        cooking_methods: vec!["茹でる".into(), "炒める".into()],
        regional_suggestions: vec![RegionalSuggestion {
            region: "カンパーニア".into(),
            dish_name: "スパゲッティ・アル・ポモドーロ".into(),
            reason: "シンプルな素材の味を活かす南イタリアの定番".into(),
        }],
    }
}

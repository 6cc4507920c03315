use crate::recipe::RecipeRequest;

const CLOSING: &str = "これらの条件でイタリア料理のレシピを教えてください。JSON形式で返してください。";

/// Turns a normalized form submission into the natural-language prompt sent
/// to the agent. Sections always appear in the same order and are left out
/// when their data is absent.
pub fn build_prompt(req: &RecipeRequest) -> String {
    let mut s = String::new();

    s.push_str("食材: ");
    s.push_str(&req.ingredients.join(", "));
    s.push('\n');

    if let Some(prefs) = &req.preferences {
        s.push_str("難易度: ");
        s.push_str(prefs.difficulty.label_ja());
        s.push('\n');

        if let Some(minutes) = prefs.cooking_time {
            s.push_str(&format!("調理時間: {minutes}分\n"));
        }
        if let Some(servings) = prefs.servings {
            s.push_str(&format!("人数: {servings}人分\n"));
        }
        if !prefs.dietary_restrictions.is_empty() {
            let labels: Vec<&str> = prefs
                .dietary_restrictions
                .iter()
                .map(|d| d.label_ja())
                .collect();
            s.push_str("食事制限: ");
            s.push_str(&labels.join(", "));
            s.push('\n');
        }
    }

    if req.include_variations {
        if req.requested_variations.is_empty() {
            s.push_str("バリエーション: おまかせで提案してください\n");
        } else {
            let labels: Vec<&str> = req
                .requested_variations
                .iter()
                .map(|v| v.label_ja())
                .collect();
            s.push_str("バリエーション: ");
            s.push_str(&labels.join(", "));
            s.push('\n');
        }
    }

    s.push('\n');
    s.push_str(CLOSING);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{DietaryRestriction, Difficulty, Preferences, VariationType};

    fn request(ingredients: &[&str]) -> RecipeRequest {
        RecipeRequest {
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn ingredients_appear_verbatim_in_order() {
        let prompt = build_prompt(&request(&["トマト", "basil", "モッツァレラ"]));

        let t = prompt.find("トマト").unwrap();
        let b = prompt.find("basil").unwrap();
        let m = prompt.find("モッツァレラ").unwrap();
        assert!(t < b && b < m);
        assert!(prompt.starts_with("食材: トマト, basil, モッツァレラ\n"));
    }

    #[test]
    fn preferences_are_localized_and_ordered() {
        let mut req = request(&["pasta"]);
        req.preferences = Some(Preferences {
            difficulty: Difficulty::Hard,
            cooking_time: Some(45),
            servings: Some(4),
            dietary_restrictions: vec![DietaryRestriction::Vegan],
        });

        let prompt = build_prompt(&req);
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(
            &lines[..5],
            &[
                "食材: pasta",
                "難易度: 難しい",
                "調理時間: 45分",
                "人数: 4人分",
                "食事制限: ビーガン",
            ]
        );
        assert!(!prompt.contains("hard"));
    }

    #[test]
    fn missing_preferences_omit_the_section() {
        let prompt = build_prompt(&request(&["pasta"]));
        assert!(!prompt.contains("難易度"));
        assert!(!prompt.contains("人数"));
        assert!(prompt.ends_with(CLOSING));
    }

    #[test]
    fn variations_are_omitted_unless_included() {
        let mut req = request(&["pasta"]);
        req.include_variations = false;
        req.requested_variations = vec![VariationType::Spicy, VariationType::Vegan];

        let prompt = build_prompt(&req);
        assert!(!prompt.contains("バリエーション"));
        assert!(!prompt.contains("スパイシー"));
    }

    #[test]
    fn requested_variations_are_localized() {
        let mut req = request(&["pasta"]);
        req.include_variations = true;
        req.requested_variations = vec![VariationType::GlutenFree, VariationType::Creamy];

        let prompt = build_prompt(&req);
        assert!(prompt.contains("バリエーション: グルテンフリー, クリーミー\n"));
        assert!(!prompt.contains("gluten-free"));
    }
}

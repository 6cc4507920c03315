use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use recipe_runner::display::DisplayRecipe;
use recipe_runner::recipe::{Difficulty, Preferences, RecipeRequest, VariationType};
use recipe_runner::server::RefusalBody;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "recipe-cli")]
#[command(about = "CLI client for the recipe-runner HTTP API")]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "http://localhost:3000", global = true)]
    server: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "120", global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask for a recipe built around the given ingredients
    Generate {
        /// Ingredients, in order of importance
        #[arg(required = true)]
        ingredients: Vec<String>,

        #[arg(short, long, value_enum, default_value = "medium")]
        difficulty: Difficulty,

        /// Maximum cooking time in minutes
        #[arg(long)]
        cooking_time: Option<u32>,

        #[arg(long)]
        servings: Option<u32>,

        /// Variation to request; repeat for several
        #[arg(short, long = "variation", value_enum)]
        variations: Vec<VariationType>,

        /// Reuse a conversation id
        #[arg(long)]
        conversation: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Check whether the agent runtime is reachable
    Status,
    /// Forget the stored result of a conversation
    Reset { conversation: String },
}

#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum Format {
    Json,
    Text,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(cli.timeout))
        .build();
    let base = cli.server.trim_end_matches('/');

    match cli.command {
        Command::Generate {
            ingredients,
            difficulty,
            cooking_time,
            servings,
            variations,
            conversation,
            format,
        } => {
            let request = RecipeRequest {
                ingredients,
                preferences: Some(Preferences {
                    difficulty,
                    cooking_time,
                    servings,
                    dietary_restrictions: Vec::new(),
                }),
                include_variations: !variations.is_empty(),
                requested_variations: variations,
                conversation_id: conversation,
            };

            let result = agent
                .post(&format!("{base}/api/recipe/generate"))
                .send_json(&request);
            match result {
                Ok(resp) => {
                    let recipe: DisplayRecipe = resp
                        .into_json()
                        .map_err(|e| anyhow!("Failed to parse recipe: {e}"))?;
                    match format {
                        Format::Json => println!("{}", serde_json::to_string_pretty(&recipe)?),
                        Format::Text => print_recipe(&recipe),
                    }
                }
                Err(ureq::Error::Status(422, resp)) => {
                    let refusal: RefusalBody = resp
                        .into_json()
                        .map_err(|e| anyhow!("Failed to parse refusal: {e}"))?;
                    print_refusal(&refusal);
                    std::process::exit(2);
                }
                Err(ureq::Error::Status(code, resp)) => {
                    let body = resp.into_string().unwrap_or_default();
                    return Err(anyhow!("Server returned HTTP {code}: {body}"));
                }
                Err(e) => return Err(anyhow!("Request failed: {e}")),
            }
        }
        Command::Status => {
            // The server answers 503 with the same body shape when disconnected.
            let body: Value = match agent.get(&format!("{base}/api/voltagent/status")).call() {
                Ok(resp) => resp.into_json()?,
                Err(ureq::Error::Status(_, resp)) => resp.into_json()?,
                Err(e) => return Err(anyhow!("Request failed: {e}")),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Reset { conversation } => {
            match agent
                .delete(&format!("{base}/api/recipe/session/{conversation}"))
                .call()
            {
                Ok(_) => println!("Cleared {conversation}"),
                Err(ureq::Error::Status(404, _)) => println!("Nothing stored for {conversation}"),
                Err(e) => return Err(anyhow!("Request failed: {e}")),
            }
        }
    }

    Ok(())
}

fn print_recipe(recipe: &DisplayRecipe) {
    let main = &recipe.main_recipe;

    if recipe.is_fallback() {
        println!("(エージェントに接続できなかったため、サンプルレシピを表示しています)\n");
    }
    println!("# {}", main.recipe_name);
    println!("{}\n", main.description);
    println!(
        "調理時間: {}分 / 難易度: {} / {}人分",
        main.cooking_time, main.difficulty, main.servings
    );
    if let Some(region) = &main.region {
        println!("地方: {region}");
    }

    println!("\n## 材料");
    for ing in &main.ingredients {
        println!("- {} {}{}", ing.name, ing.amount, ing.unit);
    }

    println!("\n## 作り方");
    for (i, step) in main.instructions.iter().enumerate() {
        println!("{}. {step}", i + 1);
    }

    if !main.tips.is_empty() {
        println!("\n## コツ");
        for tip in &main.tips {
            println!("- {tip}");
        }
    }
    if let Some(wine) = &main.wine_pairing {
        println!("\nおすすめワイン: {wine}");
    }

    if let Some(subs) = &recipe.substitutions {
        println!("\n## 変更点");
        for s in subs {
            println!("- {} → {}（{}）", s.original, s.replacement, s.reason);
        }
    }
    if let Some(benefits) = &recipe.nutritional_benefits {
        println!("\n栄養面: {benefits}");
    }

    for v in &recipe.variations {
        println!("\n## バリエーション: {} ({})", v.variation_name, v.modification_type);
        for s in &v.substitutions {
            println!("- {} → {}", s.original, s.replacement);
        }
    }
}

fn print_refusal(refusal: &RefusalBody) {
    eprintln!("{}", refusal.error);
    if !refusal.invalid_ingredients.is_empty() {
        eprintln!(
            "以下は料理の食材として使用できません: {}",
            refusal.invalid_ingredients.join("、")
        );
    }
    if let Some(msg) = &refusal.agent_message {
        eprintln!("{msg}");
    }
}

//! Recipe command - create and inspect recipes

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Input;
use recipebox_core::{NewRecipe, OperationResult, Recipe};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{get_context, get_logger, log_outcome, print_envelope};
use crate::output;

#[derive(Subcommand)]
pub enum RecipeCommands {
    /// Add a recipe for a user
    New {
        /// Owner's email address
        #[arg(long)]
        owner: String,
        /// Recipe title
        #[arg(long)]
        title: Option<String>,
        /// Preparation time in minutes
        #[arg(long)]
        time_minutes: Option<u32>,
        /// Price (up to 2 decimal places, e.g. 5.50)
        #[arg(long)]
        price: Option<String>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Source URL
        #[arg(long)]
        link: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a user's recipes
    List {
        /// Owner's email address
        #[arg(long)]
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single recipe
    Show {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl RecipeCommands {
    /// Command path as typed, for the event log
    pub fn name(&self) -> &'static str {
        match self {
            RecipeCommands::New { .. } => "recipe new",
            RecipeCommands::List { .. } => "recipe list",
            RecipeCommands::Show { .. } => "recipe show",
        }
    }
}

pub fn run(command: RecipeCommands) -> Result<()> {
    match command {
        RecipeCommands::New {
            owner,
            title,
            time_minutes,
            price,
            description,
            link,
            json,
        } => run_new(&owner, title, time_minutes, price, description, link, json),
        RecipeCommands::List { owner, json } => run_list(&owner, json),
        RecipeCommands::Show { id, json } => run_show(&id, json),
    }
}

fn run_new(
    owner_email: &str,
    title: Option<String>,
    time_minutes: Option<u32>,
    price: Option<String>,
    description: Option<String>,
    link: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let owner = ctx.account_service.get_account_by_email(owner_email)?;

    // Prompt for required fields that were not given as flags
    let title = match title {
        Some(t) => t,
        None => Input::new().with_prompt("Title").interact_text()?,
    };
    let time_minutes = match time_minutes {
        Some(m) => m,
        None => Input::new().with_prompt("Time (minutes)").interact_text()?,
    };
    let price_str = match price {
        Some(p) => p,
        None => Input::new().with_prompt("Price").interact_text()?,
    };

    // Parse as decimal text so the exact value is kept (no float round trip)
    let price: Decimal = price_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid price: {}", price_str))?;

    let mut fields = NewRecipe::new(title, time_minutes, price);
    if let Some(d) = description {
        fields = fields.with_description(d);
    }
    if let Some(l) = link {
        fields = fields.with_link(l);
    }

    let result = ctx.recipe_service.create_recipe(&owner, fields);
    log_outcome(&logger, "recipe_created", &result);

    if json {
        let envelope: OperationResult<Recipe> = result.into();
        return print_envelope(&envelope);
    }

    let recipe = result?;
    output::success("Recipe created");
    print_recipe(&recipe);
    Ok(())
}

fn run_list(owner_email: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let owner = ctx.account_service.get_account_by_email(owner_email)?;
    let recipes = ctx.recipe_service.list_recipes_for_owner(owner.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    if recipes.is_empty() {
        println!("No recipes found for {}.", owner.email);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Title", "Minutes", "Price"]);
    for recipe in &recipes {
        table.add_row(vec![
            recipe.id.to_string(),
            recipe.to_string(),
            recipe.time_minutes.to_string(),
            recipe.price.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

fn run_show(id: &str, json: bool) -> Result<()> {
    let id = Uuid::parse_str(id).map_err(|_| anyhow::anyhow!("Invalid recipe ID: {}", id))?;

    let ctx = get_context()?;
    let recipe = ctx.recipe_service.get_recipe(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        print_recipe(&recipe);
    }
    Ok(())
}

fn print_recipe(recipe: &Recipe) {
    println!("{}", recipe.to_string().bold());
    println!("  ID: {}", recipe.id);
    println!("  Owner: {}", recipe.owner_id);
    println!("  Time: {} min", recipe.time_minutes);
    println!("  Price: {}", recipe.price);
    if let Some(description) = &recipe.description {
        println!("  Description: {}", description);
    }
    if let Some(link) = &recipe.link {
        println!("  Link: {}", link);
    }
}

//! `crownwell models` — List the selectable chat models.

use crownwell_config::AppConfig;
use crownwell_core::model::SupportedModel;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let default = AppConfig::load()
        .map(|c| c.default_model)
        .unwrap_or_default();

    println!("Available models:\n");
    for model in SupportedModel::ALL {
        let marker = if model == default { "*" } else { " " };
        println!(
            " {marker} {:<14} {:<10} {}",
            model.id(),
            model.label(),
            model.description()
        );
    }
    println!("\n  * default (change with default_model or CROWNWELL_MODEL)");
    Ok(())
}

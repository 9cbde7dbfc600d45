//! Interactive prompts for the menu mode.

use crate::analytics::{ranking_today, RangeToken};
use crate::error::Result;
use crate::models::{GroupDimension, Metric};
use crate::province::PROVINCES;
use dialoguer::{theme::ColorfulTheme, FuzzySelect, Input, Select};

pub fn prompt_range() -> Result<RangeToken> {
    let items: Vec<&str> = RangeToken::ALL.iter().map(|r| r.as_str()).collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Time range")
        .items(&items)
        .default(1)
        .interact()?;
    Ok(RangeToken::ALL[idx])
}

pub fn prompt_metric() -> Result<Metric> {
    let items: Vec<&str> = Metric::ALL.iter().map(|m| m.as_str()).collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Metric")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(Metric::ALL[idx])
}

pub fn prompt_group() -> Result<GroupDimension> {
    let items: Vec<&str> = GroupDimension::ALL.iter().map(|g| g.as_str()).collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Group by")
        .items(&items)
        .default(2)
        .interact()?;
    Ok(GroupDimension::ALL[idx])
}

/// Optional province filter; blank means every province.
pub fn prompt_province_filter() -> Result<Option<String>> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Province filter (blank for all)")
        .allow_empty(true)
        .interact_text()?;
    let trimmed = input.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Picks a province from the alias table by fuzzy search over canonical and English names.
pub fn prompt_province() -> Result<String> {
    let items: Vec<String> = PROVINCES
        .iter()
        .map(|p| match p.aliases.first() {
            Some(alias) => format!("{} ({})", p.canonical, alias),
            None => p.canonical.to_string(),
        })
        .collect();
    let idx = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Province")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(PROVINCES[idx].canonical.to_string())
}

pub fn prompt_date() -> Result<String> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Date (YYYY-MM-DD, UTC+7)")
        .default(ranking_today().format("%Y-%m-%d").to_string())
        .interact_text()?;
    Ok(input)
}

pub fn prompt_limit() -> Result<i64> {
    let input: i64 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("How many rows (1-100)")
        .default(10)
        .interact_text()?;
    Ok(input)
}

pub fn prompt_days() -> Result<u32> {
    let input: u32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Days of sample data to generate")
        .default(7)
        .interact_text()?;
    Ok(input)
}

//! Taste profile: aggregate preferences derived from a user's recipes.
//!
//! Rebuilt on demand and never stored. It feeds suggestion generation,
//! which lives outside this crate.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::duration_minutes;

pub const TOP_INGREDIENTS: usize = 10;
pub const TOP_PLANNED: usize = 5;

/// Keyword -> cuisine. A recipe counts once per cuisine however many of
/// its keywords match.
const CUISINE_KEYWORDS: &[(&str, &str)] = &[
    ("tortilla", "Mexican"),
    ("taco", "Mexican"),
    ("enchilada", "Mexican"),
    ("salsa", "Mexican"),
    ("jalapeño", "Mexican"),
    ("jalapeno", "Mexican"),
    ("chipotle", "Mexican"),
    ("pasta", "Italian"),
    ("spaghetti", "Italian"),
    ("risotto", "Italian"),
    ("parmesan", "Italian"),
    ("mozzarella", "Italian"),
    ("basil", "Italian"),
    ("lasagna", "Italian"),
    ("soy sauce", "Asian"),
    ("ginger", "Asian"),
    ("sesame", "Asian"),
    ("miso", "Asian"),
    ("stir fry", "Asian"),
    ("stir-fry", "Asian"),
    ("rice vinegar", "Asian"),
    ("fish sauce", "Asian"),
    ("curry", "Indian"),
    ("garam masala", "Indian"),
    ("turmeric", "Indian"),
    ("naan", "Indian"),
    ("paneer", "Indian"),
    ("feta", "Mediterranean"),
    ("hummus", "Mediterranean"),
    ("tahini", "Mediterranean"),
    ("chickpea", "Mediterranean"),
    ("kalamata", "Mediterranean"),
    ("tzatziki", "Mediterranean"),
    ("bbq", "American"),
    ("burger", "American"),
    ("mac and cheese", "American"),
    ("cornbread", "American"),
];

/// Leading quantity, unit and filler words: "2 1/2 cups chopped ".
static INGREDIENT_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[\d¼½¾⅓⅔⅛/.\-\s]+|\([^)]*\)\s*|(?:cups?|c|tablespoons?|tbsps?|tbs|teaspoons?|tsps?|pounds?|lbs?|ounces?|oz|grams?|g|kg|ml|l|liters?|cans?|cloves?|pinch(?:es)?|dash(?:es)?|large|medium|small|fresh|freshly|chopped|minced|diced|sliced|of)\b\.?\s*)+",
    )
    .expect("Invalid ingredient prefix regex")
});

/// One of the user's recipes, reduced to what the profile needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecipe {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub cook_time: Option<String>,
    #[serde(default)]
    pub times_planned: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasteProfile {
    pub recipe_count: usize,
    pub top_ingredients: Vec<Frequency>,
    pub categories: Vec<Frequency>,
    pub cuisines: Vec<Frequency>,
    pub average_cook_minutes: Option<u32>,
    pub most_planned: Vec<Frequency>,
}

impl TasteProfile {
    pub fn build(recipes: &[ProfileRecipe]) -> Self {
        let mut ingredients: HashMap<String, usize> = HashMap::new();
        let mut categories: HashMap<String, usize> = HashMap::new();
        let mut cuisines: HashMap<String, usize> = HashMap::new();
        let mut cook_minutes = Vec::new();

        for recipe in recipes {
            // Count each ingredient once per recipe
            let keys: BTreeSet<String> = recipe
                .ingredients
                .iter()
                .filter_map(|line| ingredient_key(line))
                .collect();
            for key in keys {
                *ingredients.entry(key).or_default() += 1;
            }

            let recipe_categories: BTreeSet<String> = recipe
                .categories
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            for category in recipe_categories {
                *categories.entry(category).or_default() += 1;
            }

            for cuisine in detect_cuisines(recipe) {
                *cuisines.entry(cuisine.to_string()).or_default() += 1;
            }

            if let Some(minutes) = recipe.cook_time.as_deref().and_then(duration_minutes) {
                cook_minutes.push(minutes);
            }
        }

        let average_cook_minutes = if cook_minutes.is_empty() {
            None
        } else {
            let total: u64 = cook_minutes.iter().map(|m| u64::from(*m)).sum();
            Some((total as f64 / cook_minutes.len() as f64).round() as u32)
        };

        let mut most_planned: Vec<Frequency> = recipes
            .iter()
            .filter(|r| r.times_planned > 0)
            .map(|r| Frequency {
                name: r.title.trim().to_string(),
                count: r.times_planned as usize,
            })
            .collect();
        sort_frequencies(&mut most_planned);
        most_planned.truncate(TOP_PLANNED);

        let mut top_ingredients = into_frequencies(ingredients);
        top_ingredients.truncate(TOP_INGREDIENTS);

        Self {
            recipe_count: recipes.len(),
            top_ingredients,
            categories: into_frequencies(categories),
            cuisines: into_frequencies(cuisines),
            average_cook_minutes,
            most_planned,
        }
    }
}

/// Reduce an ingredient line to a comparable name: "2 cups chopped onion, diced" -> "onion".
pub fn ingredient_key(line: &str) -> Option<String> {
    let lower = line.to_lowercase();
    let name = lower.split(',').next().unwrap_or_default();
    let name = INGREDIENT_PREFIX_REGEX.replace(name.trim(), "");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn detect_cuisines(recipe: &ProfileRecipe) -> BTreeSet<&'static str> {
    let haystack = std::iter::once(recipe.title.as_str())
        .chain(recipe.ingredients.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    CUISINE_KEYWORDS
        .iter()
        .filter(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, cuisine)| *cuisine)
        .collect()
}

fn into_frequencies(counts: HashMap<String, usize>) -> Vec<Frequency> {
    let mut frequencies: Vec<Frequency> = counts
        .into_iter()
        .map(|(name, count)| Frequency { name, count })
        .collect();
    sort_frequencies(&mut frequencies);
    frequencies
}

/// Highest count first, ties alphabetical.
fn sort_frequencies(frequencies: &mut [Frequency]) {
    frequencies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
}

use regex::{Regex, RegexBuilder};

use crate::error::Result;
use crate::models::Category;

// Order matters: first match wins.
pub const CATEGORY_RULES: &[(&str, Category)] = &[
    (r"Homematic|Smart Home|Zigbee|Shelly", Category::SmartHome),
    (r"3D.*Drucker|3D.*Printer|Filament|SUNLU|CNC KITCHEN|Nozzle", Category::ThreeDPrinting),
    (r"Golf", Category::Golf),
    (
        r"DIY & Tools|Power.*Tool|Hand Tools|Drill|Bosch Professional|Screwdriver|Werkzeug",
        Category::Tools,
    ),
    (
        r"Electronics|TV.*Video|Headphones|Computer|HDMI|Apple.*Pods|USB|Cable|Kabel",
        Category::Electronics,
    ),
    (r"Kitchen|Fryer|Knife|Waterdrop|Küche", Category::Kitchen),
    (r"Furniture|Desk|Chair|Möbel|Regal", Category::Furniture),
    (
        r"Ferienwohnung|Vermietung|Rental Property|Key Lock Box|Schlüsseltresor",
        Category::RentalProperty,
    ),
    (r"Fashion|Clothing|Shoes|T-Shirt|Sneaker|Socken|Jacke", Category::Clothing),
    (r"Toys|Games|Spielzeug|Puzzle|Board Game", Category::Games),
];

pub const DIGITAL_PATTERNS: &[&str] = &[
    r"Audible",
    r"Kindle",
    r"eBook",
    r"Digital.*Download",
    r"gp/video/detail",
    r"digi_order_details",
];

pub const CONSUMABLE_PATTERNS: &[&str] = &[
    r"Batter(y|ie)|Alkaline",
    r"Wipes|Tücher",
    r"Toothbrush.*Head|Aufsteckbürst",
    r"Shampoo|Duschgel|Lotion|Seife|Handcreme",
    r"Magnesium|Vitamin",
    r"Interdentalbürst",
    r"Rasiergel",
    r"Feuerzeuggas",
    r"\bGin\b|Whisky|Spirits",
    r"Grocery",
];

fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Ordered (pattern, tag) table evaluated first-match-wins.
pub struct PatternTable<T> {
    rules: Vec<(Regex, T)>,
}

impl<T: Copy> PatternTable<T> {
    pub fn compile(rules: &[(&str, T)]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|(pattern, tag)| -> Result<(Regex, T)> { Ok((compile(pattern)?, *tag)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn first_match(&self, text: &str) -> Option<T> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, tag)| *tag)
    }
}

impl PatternTable<()> {
    pub fn compile_flags(patterns: &[&str]) -> Result<Self> {
        let rules: Vec<(&str, ())> = patterns.iter().map(|p| (*p, ())).collect();
        Self::compile(&rules)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub is_digital: bool,
    pub is_consumable: bool,
}

/// Heuristic classification of a line item: category, digital, consumable.
///
/// Pure and deterministic; compiled once per command and shared by every row.
pub struct Classifier {
    categories: PatternTable<Category>,
    digital: PatternTable<()>,
    consumable: PatternTable<()>,
}

impl Classifier {
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            categories: PatternTable::compile(CATEGORY_RULES)?,
            digital: PatternTable::compile_flags(DIGITAL_PATTERNS)?,
            consumable: PatternTable::compile_flags(CONSUMABLE_PATTERNS)?,
        })
    }

    pub fn categorize(&self, name: &str, merchant_category: Option<&str>) -> Category {
        let combined = format!("{name} {}", merchant_category.unwrap_or_default());
        self.categories
            .first_match(&combined)
            .unwrap_or(Category::Other)
    }

    pub fn is_digital(&self, name: &str, merchant_category: Option<&str>, item_url: Option<&str>) -> bool {
        let combined = format!(
            "{name} {} {}",
            item_url.unwrap_or_default(),
            merchant_category.unwrap_or_default()
        );
        self.digital.is_match(&combined)
    }

    pub fn is_consumable(&self, name: &str, merchant_category: Option<&str>) -> bool {
        let combined = format!("{name} {}", merchant_category.unwrap_or_default());
        self.consumable.is_match(&combined)
    }

    pub fn classify(&self, name: &str, merchant_category: Option<&str>, item_url: Option<&str>) -> Classification {
        Classification {
            category: self.categorize(name, merchant_category),
            is_digital: self.is_digital(name, merchant_category, item_url),
            is_consumable: self.is_consumable(name, merchant_category),
        }
    }
}

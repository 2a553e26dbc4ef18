use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use thiserror::Error;

/// One line of a recipe. `parts` is the ratio of this ingredient in the drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// A drink as stored in the `drinks` table, recipe decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Raw table row; `recipe` holds the JSON-encoded ingredient list
#[derive(Debug, Clone, FromRow)]
pub struct DrinkRow {
    pub id: i64,
    pub title: String,
    pub recipe: String,
}

/// Wire representation of a drink, produced by [`Drink::short`] or [`Drink::long`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkView {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    /// Public projection: ingredient ratios are zeroed so recipes stay proprietary.
    pub fn short(&self) -> DrinkView {
        DrinkView {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|i| Ingredient { parts: 0, ..i.clone() })
                .collect(),
        }
    }

    /// Full projection for holders of the detail permission
    pub fn long(&self) -> DrinkView {
        DrinkView {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.clone(),
        }
    }
}

impl TryFrom<DrinkRow> for Drink {
    type Error = serde_json::Error;

    fn try_from(row: DrinkRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            recipe: serde_json::from_str(&row.recipe)?,
        })
    }
}

/// Reasons a create or update body is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field 'title' must be a non-empty string")]
    InvalidTitle,

    #[error("Field 'recipe' must be an ingredient or a list of ingredients")]
    InvalidRecipe,

    #[error("Ingredient {index} is invalid: {reason}")]
    InvalidIngredient { index: usize, reason: String },
}

/// Validated body of `POST /drinks`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl NewDrink {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let mut fields = into_object(body)?;
        let title = fields
            .remove("title")
            .filter(|v| !v.is_null())
            .ok_or(ValidationError::MissingField("title"))?;
        let recipe = fields
            .remove("recipe")
            .filter(|v| !v.is_null())
            .ok_or(ValidationError::MissingField("recipe"))?;

        Ok(Self {
            title: parse_title(title)?,
            recipe: parse_recipe(recipe)?,
        })
    }
}

/// Validated body of `PATCH /drinks/:id`; absent or null fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrinkPatch {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

impl DrinkPatch {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let mut fields = into_object(body)?;
        let title = match fields.remove("title") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_title(v)?),
        };
        let recipe = match fields.remove("recipe") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_recipe(v)?),
        };
        Ok(Self { title, recipe })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.recipe.is_none()
    }

    /// Returns `drink` with the supplied fields replaced
    pub fn apply(&self, drink: &Drink) -> Drink {
        Drink {
            id: drink.id,
            title: self.title.clone().unwrap_or_else(|| drink.title.clone()),
            recipe: self.recipe.clone().unwrap_or_else(|| drink.recipe.clone()),
        }
    }
}

fn into_object(body: Value) -> Result<Map<String, Value>, ValidationError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ValidationError::NotAnObject),
    }
}

fn parse_title(value: Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ValidationError::InvalidTitle),
    }
}

/// Accepts a list of ingredients or a single ingredient object (wrapped into a list)
fn parse_recipe(value: Value) -> Result<Vec<Ingredient>, ValidationError> {
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return Err(ValidationError::InvalidRecipe),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let ingredient: Ingredient = serde_json::from_value(item)
                .map_err(|e| ValidationError::InvalidIngredient { index, reason: e.to_string() })?;
            if ingredient.parts == 0 {
                return Err(ValidationError::InvalidIngredient {
                    index,
                    reason: "parts must be a positive integer".to_string(),
                });
            }
            Ok(ingredient)
        })
        .collect()
}

pub mod drink;

pub use drink::{Drink, DrinkPatch, DrinkRow, DrinkView, Ingredient, NewDrink, ValidationError};

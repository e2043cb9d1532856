//! SQLite persistence for meal records.

mod model;
mod repository;

pub use model::{MealChangesetDB, MealDB, NewMealDB};
pub use repository::MealRepository;

use serde::{Deserialize, Serialize};

use weeb_core::validation::{check_length, Length};
use weeb_core::{CategoryId, DomainError, Entity};

/// Longest accepted category name.
pub const CATEGORY_NAME_MAX: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

/// Validated category ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn into_category(self, id: CategoryId) -> Category {
        Category { id, name: self.name }
    }
}

/// Administrative create payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: String,
}

impl CategoryInput {
    pub fn validate(self) -> Result<NewCategory, DomainError> {
        let name = self.name.trim();
        match check_length(name, 1, Some(CATEGORY_NAME_MAX)) {
            Length::TooShort => Err(DomainError::validation("name", "Category name is required.")),
            Length::TooLong => Err(DomainError::validation(
                "name",
                format!("Category name cannot exceed {CATEGORY_NAME_MAX} characters."),
            )),
            Length::Ok => Ok(NewCategory { name: name.to_string() }),
        }
    }
}

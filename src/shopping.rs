use crate::models::ShoppingItem;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

/// Render cart totals as a plain-text list, one ingredient per line.
pub fn render_shopping_list(items: &[ShoppingItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{} – {} {}\n",
                item.name, item.amount, item.measurement_unit
            )
        })
        .collect()
}

//! Category display formatting

use crate::models::Category;

/// Format categories as a simple table
pub fn format_category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.\n\nRun 'dues init' to create default categories.\n"
            .to_string();
    }

    let name_width = categories
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<8}  {}\n",
        "Name",
        "Kind",
        "ID",
        name_width = name_width
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<8}  {:-<12}\n",
        "",
        "",
        "",
        name_width = name_width
    ));

    for category in categories {
        let archived = if category.archived { " (archived)" } else { "" };
        output.push_str(&format!(
            "{:<name_width$}  {:<8}  {}{}\n",
            category.name,
            category.kind.to_string(),
            category.id,
            archived,
            name_width = name_width
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryKind;

    #[test]
    fn test_format_category_list() {
        let mut archived = Category::new("Old Levy", CategoryKind::Income);
        archived.archive();
        let categories = vec![Category::new("Monthly Dues", CategoryKind::Income), archived];

        let output = format_category_list(&categories);
        assert!(output.contains("Monthly Dues"));
        assert!(output.contains("Old Levy"));
        assert!(output.contains("(archived)"));
    }

    #[test]
    fn test_empty_list_suggests_init() {
        assert!(format_category_list(&[]).contains("dues init"));
    }
}

use crate::domain::types::{Order, format_amount};

/// `{variable}` placeholders available to SMS templates.
pub fn template_variables(order: &Order, status_name: &str) -> [(&'static str, String); 8] {
    [
        ("{customer_name}", order.customer_name.clone()),
        ("{order_id}", order.id.to_string()),
        ("{phone}", order.customer_phone.clone()),
        ("{total_amount}", format_amount(order.total_amount)),
        ("{city}", order.city.clone().unwrap_or_default()),
        ("{address}", order.address.clone().unwrap_or_default()),
        ("{tracking_number}", order.tracking_number.clone().unwrap_or_default()),
        ("{status}", status_name.to_owned()),
    ]
}

/// Literal placeholder substitution. Unknown placeholders are left as-is.
pub fn render_template(content: &str, variables: &[(&str, String)]) -> String {
    variables
        .iter()
        .fold(content.to_owned(), |text, (placeholder, value)| {
            text.replace(placeholder, value)
        })
}

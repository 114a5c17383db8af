// Text handed to the injection primitive is limited to ASCII.

/// Drops every character outside the ASCII range (0..=127), keeping the rest in order.
pub fn retain_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

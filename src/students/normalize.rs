/// Normalizes an optional value; `None` stays `None`.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value.map(normalize_str)
}

pub fn normalize_str(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| match c {
            'Ç' => 'C',
            'Á' | 'À' | 'Ã' | 'Â' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Õ' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}

/// Normalizes and upper-cases.
pub fn normalize_upper(value: Option<&str>) -> Option<String> {
    normalize(value).map(|s| s.to_uppercase())
}

/// Upper-cases without any other change.
pub fn upper(value: Option<&str>) -> Option<String> {
    value.map(str::to_uppercase)
}

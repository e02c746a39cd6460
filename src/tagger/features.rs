/// Split a MeCab feature line into its fields.
///
/// Fields are comma separated. Some dictionaries put commas inside a field
/// (UniDic accent data, for instance) and wrap that field in double quotes;
/// such a field is reassembled and returned without its quotes. A quoted
/// field that is never closed is dropped.
pub fn parse_features(csv: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut quoted: Option<String> = None;

    for token in csv.split(',') {
        if let Some(mut field) = quoted.take() {
            field.push(',');
            match token.strip_suffix('"') {
                Some(last) => {
                    field.push_str(last);
                    fields.push(field);
                }
                None => {
                    field.push_str(token);
                    quoted = Some(field);
                }
            }
        } else if let Some(rest) = token.strip_prefix('"') {
            match rest.strip_suffix('"') {
                Some(inner) => fields.push(inner.to_string()),
                None => quoted = Some(rest.to_string()),
            }
        } else {
            fields.push(token.to_string());
        }
    }

    fields
}

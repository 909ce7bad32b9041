use hs_core::ScriptValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathSegment {
    Key(String),
    Index(usize),
}

/// Splits `a.b[0].c` into key and index segments. Bracketed quotes are accepted: `a["b"]`.
pub(crate) fn parse_nested_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.').map(str::trim).filter(|part| !part.is_empty()) {
        let (head, mut rest) = match part.find('[') {
            Some(index) => (&part[..index], &part[index..]),
            None => (part, ""),
        };
        if !head.is_empty() {
            segments.push(PathSegment::Key(head.to_string()));
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(close) = stripped.find(']') else {
                break;
            };
            let inner = stripped[..close].trim();
            let unquoted = inner.trim_matches(|ch: char| ch == '"' || ch == '\'');
            match inner.parse::<usize>() {
                Ok(index) if unquoted == inner => segments.push(PathSegment::Index(index)),
                _ => segments.push(PathSegment::Key(unquoted.to_string())),
            }
            rest = &stripped[close + 1..];
        }
    }
    segments
}

pub(crate) fn lookup_path<'a>(
    target: &'a ScriptValue,
    path: &[PathSegment],
) -> Option<&'a ScriptValue> {
    let Some((head, tail)) = path.split_first() else {
        return Some(target);
    };
    let next = match (target, head) {
        (ScriptValue::Map(entries), PathSegment::Key(key)) => entries.get(key)?,
        (ScriptValue::Map(entries), PathSegment::Index(index)) => {
            entries.get(&index.to_string())?
        }
        (ScriptValue::Array(values), PathSegment::Index(index)) => values.get(*index)?,
        _ => return None,
    };
    lookup_path(next, tail)
}

use std::path::{Component, Path, PathBuf};

/// Resolve user input into an absolute, lexically normalized path.
///
/// Expands a leading `~`, then `$VAR`, `${VAR}` and `%VAR%` tokens, joins
/// relative results onto `base`, and folds `.` / `..` components. Symlinks
/// are not resolved.
pub fn resolve(input: &str, base: &Path) -> PathBuf {
    resolve_with(input, base, dirs::home_dir().as_deref(), |name| {
        std::env::var(name).ok()
    })
}

/// [`resolve`] with explicit home directory and variable lookup.
pub fn resolve_with<F>(input: &str, base: &Path, home: Option<&Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_vars(&expand_home(input.trim(), home), lookup);
    let path = Path::new(&expanded);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    normalize(&joined)
}

fn expand_home(input: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return input.to_string();
    };
    if input == "~" {
        return home.to_string_lossy().into_owned();
    }
    match input
        .strip_prefix("~/")
        .or_else(|| input.strip_prefix("~\\"))
    {
        Some(rest) => home.join(rest).to_string_lossy().into_owned(),
        None => input.to_string(),
    }
}

/// Replace `$VAR`, `${VAR}` and `%VAR%`; unknown variables stay literal.
fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            '$' if chars.get(i + 1) == Some(&'{') => chars[i + 2..]
                .iter()
                .position(|&ch| ch == '}')
                .map(|len| (chars[i + 2..i + 2 + len].iter().collect::<String>(), len + 3)),
            '$' => {
                let len = chars[i + 1..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == '_')
                    .count();
                (len > 0).then(|| (chars[i + 1..i + 1 + len].iter().collect::<String>(), len + 1))
            }
            '%' => chars[i + 1..]
                .iter()
                .position(|&ch| ch == '%')
                .filter(|&len| len > 0)
                .map(|len| (chars[i + 1..i + 1 + len].iter().collect::<String>(), len + 2)),
            _ => None,
        };

        match token.and_then(|(name, consumed)| lookup(&name).map(|value| (value, consumed))) {
            Some((value, consumed)) => {
                out.push_str(&value);
                i += consumed;
            }
            None => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Fold `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}

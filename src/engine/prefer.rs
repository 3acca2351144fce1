// src/engine/prefer.rs

//! Deterministic choice among candidate providers.
//!
//! Given the consuming action's source name and the canonical names of every
//! provision carrying the requested tag, the winner is decided
//! lexicographically: longest common string prefix with the source name,
//! then shallowest path, then alphabetically earliest name. Two candidates
//! with identical canonical names are an internal diagnostic; the incumbent
//! is kept so the choice stays consistent.

use std::cmp::Ordering;

use tracing::error;

pub fn file_depth(name: &str) -> usize {
    name.bytes().filter(|&b| b == b'/').count()
}

pub fn common_prefix_length(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// Pick the preferred candidate, returning its index in iteration order.
pub fn choose_preferred<'a, I>(src_name: &str, candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, &str, usize, usize)> = None;

    for (i, name) in candidates.into_iter().enumerate() {
        let (best_name, best_depth, best_prefix) = match best {
            None => {
                best = Some((
                    i,
                    name,
                    file_depth(name),
                    common_prefix_length(src_name, name),
                ));
                continue;
            }
            Some((_, n, d, p)) => (n, d, p),
        };

        let prefix = common_prefix_length(src_name, name);
        if prefix < best_prefix {
            // Prefer the provider that is closer in the directory tree.
            continue;
        }
        if prefix == best_prefix {
            let depth = file_depth(name);
            if depth > best_depth {
                // Prefer the provider that is less deeply nested.
                continue;
            }
            if depth == best_depth {
                match best_name.cmp(name) {
                    // Prefer the name that comes first alphabetically.
                    Ordering::Less => continue,
                    Ordering::Equal => {
                        error!(name = %name, "two providers have the same canonical name");
                        continue;
                    }
                    Ordering::Greater => {}
                }
            }
        }

        best = Some((
            i,
            name,
            file_depth(name),
            common_prefix_length(src_name, name),
        ));
    }

    best.map(|(i, _, _, _)| i)
}

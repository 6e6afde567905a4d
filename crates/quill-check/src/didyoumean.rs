//! "Did you mean …?" candidate ranking for unknown names.
//!
//! Ranks a candidate pool by Levenshtein distance to the probe. Callers
//! build the pool (registered type names, built-ins) and format the result
//! into a diagnostic message.

/// Candidates further than this from the probe are never suggested.
const MAX_DISTANCE: usize = 3;

/// Cap on how many alternatives one diagnostic offers.
const MAX_SUGGESTIONS: usize = 3;

/// Return the closest matches to `probe` from `candidates`, best first.
///
/// A candidate whose entire text would have to change is noise and is
/// dropped even when it is short enough to fall under the cutoff.
pub fn suggest(probe: &str, candidates: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut ranked: Vec<(usize, String)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let dist = edit_distance(probe, &candidate);
            (dist <= MAX_DISTANCE && dist < candidate.chars().count()).then_some((dist, candidate))
        })
        .collect();
    ranked.sort();
    ranked.truncate(MAX_SUGGESTIONS);
    ranked.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Levenshtein distance over chars, two-row dynamic programming.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

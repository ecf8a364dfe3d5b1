//! Picks which repositories get a deep crawl.
//!
//! A plain "most recently pushed" cut over-represents whatever the developer
//! happens to work on this month. The selector instead spreads the budget over
//! languages first, then over the repository timeline, and only then spends
//! what is left on forks and repositories owned by someone else.

use crate::github::types::Repository;
use std::collections::HashSet;

fn is_owned_source(repo: &Repository, username: &str) -> bool {
    !repo.fork && repo.owner.is(username)
}

/// Returns the indices of the repositories to deep-crawl, ascending
pub fn select_indices(repos: &[Repository], max_repos: usize, username: &str) -> Vec<usize> {
    if repos.len() <= max_repos {
        return (0..repos.len()).collect();
    }

    let mut selected: HashSet<usize> = HashSet::with_capacity(max_repos);

    // Buckets keep first-appearance order so equal inputs select equally.
    let mut buckets: Vec<(&str, Vec<usize>)> = Vec::new();
    for (i, repo) in repos.iter().enumerate() {
        if !is_owned_source(repo, username) {
            continue;
        }
        let language = repo.language.as_str();
        match buckets.iter_mut().find(|(lang, _)| *lang == language) {
            Some((_, members)) => members.push(i),
            None => buckets.push((language, vec![i])),
        }
    }

    let language_budget = (max_repos / 2).max(1);
    let mut round = 0;
    while selected.len() < language_budget {
        let mut added = false;
        for (_, members) in &buckets {
            if selected.len() >= language_budget {
                break;
            }
            if let Some(&i) = members.get(round) {
                selected.insert(i);
                added = true;
            }
        }
        if !added {
            break;
        }
        round += 1;
    }

    let mut timeline: Vec<usize> = (0..repos.len())
        .filter(|i| !selected.contains(i) && is_owned_source(&repos[*i], username))
        .collect();
    timeline.sort_by_key(|&i| repos[i].created_at);
    let remaining = max_repos.saturating_sub(selected.len());
    if remaining > 0 && !timeline.is_empty() {
        let step = (timeline.len() / remaining).max(1);
        for &i in timeline.iter().step_by(step) {
            if selected.len() >= max_repos {
                break;
            }
            selected.insert(i);
        }
    }

    if selected.len() < max_repos {
        let mut others: Vec<usize> = (0..repos.len())
            .filter(|i| !selected.contains(i) && !is_owned_source(&repos[*i], username))
            .collect();
        others.sort_by(|a, b| repos[*b].stargazers_count.cmp(&repos[*a].stargazers_count));
        for i in others {
            if selected.len() >= max_repos {
                break;
            }
            selected.insert(i);
        }
    }

    let mut indices: Vec<usize> = selected.into_iter().collect();
    indices.sort_unstable();
    indices
}

/// Selects up to `max_repos` repositories covering languages and history
///
/// Returns every repository when there are at most `max_repos`; otherwise
/// exactly `max_repos`, in input order.
pub fn select_diverse(repos: &[Repository], max_repos: usize, username: &str) -> Vec<Repository> {
    select_indices(repos, max_repos, username)
        .into_iter()
        .map(|i| repos[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::Account;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn repo(name: &str, owner: &str, language: &str, fork: bool, year: i32, stars: u64) -> Repository {
        Repository {
            name: name.to_string(),
            full_name: format!("{owner}/{name}"),
            owner: Account {
                login: owner.to_string(),
            },
            language: language.to_string(),
            fork,
            stargazers_count: stars,
            created_at: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single(),
            ..Default::default()
        }
    }

    fn names(repos: &[Repository]) -> Vec<&str> {
        repos.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_fewer_than_budget_returns_input() {
        let repos = vec![
            repo("a", "dev", "Go", false, 2020, 0),
            repo("b", "dev", "Rust", true, 2021, 0),
        ];
        assert_eq!(names(&select_diverse(&repos, 5, "dev")), vec!["a", "b"]);
        assert_eq!(names(&select_diverse(&repos, 2, "dev")), vec!["a", "b"]);
    }

    #[test]
    fn test_language_diversity() {
        let repos = vec![
            repo("go1", "dev", "Go", false, 2018, 0),
            repo("go2", "dev", "Go", false, 2019, 0),
            repo("go3", "dev", "Go", false, 2020, 0),
            repo("py1", "dev", "Python", false, 2021, 0),
            repo("rs1", "dev", "Rust", false, 2022, 0),
            repo("ts1", "dev", "TypeScript", false, 2023, 0),
        ];
        let picked = select_diverse(&repos, 4, "dev");
        assert_eq!(picked.len(), 4);

        let languages: HashSet<&str> = picked.iter().map(|r| r.language.as_str()).collect();
        assert!(languages.len() >= 3, "languages: {languages:?}");
    }

    #[test]
    fn test_forks_deprioritized() {
        let repos = vec![
            repo("fork1", "dev", "Go", true, 2020, 1000),
            repo("own1", "dev", "Go", false, 2020, 1),
            repo("fork2", "dev", "Rust", true, 2021, 500),
            repo("own2", "dev", "Rust", false, 2021, 2),
        ];
        assert_eq!(names(&select_diverse(&repos, 2, "dev")), vec!["own1", "own2"]);
    }

    #[test]
    fn test_non_owned_filled_by_stars() {
        let repos = vec![
            repo("own", "dev", "Go", false, 2020, 0),
            repo("small", "org", "Go", false, 2020, 3),
            repo("big", "org", "Go", false, 2020, 300),
            repo("mid", "org", "Go", false, 2020, 30),
        ];
        assert_eq!(names(&select_diverse(&repos, 3, "dev")), vec!["own", "big", "mid"]);
    }

    #[test]
    fn test_owner_match_is_case_insensitive() {
        let repos = vec![
            repo("a", "Dev", "Go", false, 2020, 0),
            repo("b", "other", "Go", false, 2020, 99),
            repo("c", "DEV", "C", false, 2020, 0),
        ];
        assert_eq!(names(&select_diverse(&repos, 2, "dev")), vec!["a", "c"]);
    }

    #[test]
    fn test_timeline_spread() {
        let repos: Vec<_> = (0..10)
            .map(|i| repo(&format!("r{i}"), "dev", "Go", false, 2010 + i, 0))
            .collect();
        let picked = select_indices(&repos, 4, "dev");

        assert_eq!(picked.len(), 4);
        // Round-robin takes r0 and r1, then every fourth of the rest by age.
        assert_eq!(picked, vec![0, 1, 2, 6]);
    }

    #[test]
    fn test_deterministic() {
        let repos: Vec<_> = ["Go", "Rust", "", "Go", "C", "", "Rust", "Zig"]
            .iter()
            .enumerate()
            .map(|(i, lang)| repo(&format!("r{i}"), "dev", lang, i % 3 == 0, 2015 + i as i32, i as u64))
            .collect();

        let first = select_indices(&repos, 5, "dev");
        for _ in 0..10 {
            assert_eq!(select_indices(&repos, 5, "dev"), first);
        }
        assert_eq!(first.len(), 5);
    }
}

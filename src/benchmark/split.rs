use crate::crawl::ActivityAggregate;
use serde::{Deserialize, Serialize};

/// Review comment withheld from profile building and used as ground truth
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeldOutSample {
    pub repo_full_name: String,
    pub body: String,
    pub path: String,
    pub diff_hunk: String,
}

/// Moves up to `max` review comments that carry a diff hunk out of `data`
///
/// Repositories and their comments are walked in stored order; everything
/// not taken stays where it was.
pub fn split_reviews(data: &mut ActivityAggregate, max: usize) -> Vec<HeldOutSample> {
    let mut held_out = Vec::new();
    for repo in &mut data.repos {
        if held_out.len() >= max {
            break;
        }
        let comments = std::mem::take(&mut repo.review_comments);
        for comment in comments {
            if held_out.len() < max && !comment.diff_hunk.is_empty() {
                held_out.push(HeldOutSample {
                    repo_full_name: repo.full_name.clone(),
                    body: comment.body,
                    path: comment.path,
                    diff_hunk: comment.diff_hunk,
                });
            } else {
                repo.review_comments.push(comment);
            }
        }
    }
    held_out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::model::{RepositoryRecord, ReviewCommentRecord};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn comment(body: &str, hunk: &str) -> ReviewCommentRecord {
        ReviewCommentRecord {
            body: body.to_string(),
            path: format!("{body}.rs"),
            diff_hunk: hunk.to_string(),
            ..Default::default()
        }
    }

    fn aggregate(repos: Vec<(&str, Vec<ReviewCommentRecord>)>) -> ActivityAggregate {
        ActivityAggregate {
            repos: repos
                .into_iter()
                .map(|(name, review_comments)| RepositoryRecord {
                    full_name: name.to_string(),
                    review_comments,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_takes_hunks_in_order() {
        let mut data = aggregate(vec![
            ("o/a", vec![comment("a1", ""), comment("a2", "@@ a2")]),
            ("o/b", vec![comment("b1", "@@ b1"), comment("b2", "@@ b2"), comment("b3", "@@ b3")]),
        ]);

        let held_out = split_reviews(&mut data, 3);

        let bodies: Vec<_> = held_out.iter().map(|s| s.body.as_str()).collect();
        assert_eq!(bodies, vec!["a2", "b1", "b2"]);
        assert_eq!(held_out[0].repo_full_name, "o/a");
        assert_eq!(held_out[1].path, "b1.rs");

        let remaining: Vec<Vec<&str>> = data
            .repos
            .iter()
            .map(|r| r.review_comments.iter().map(|c| c.body.as_str()).collect())
            .collect();
        assert_eq!(remaining, vec![vec!["a1"], vec!["b3"]]);
    }

    #[test]
    fn test_zero_max_leaves_data_alone() {
        let mut data = aggregate(vec![("o/a", vec![comment("a1", "@@")])]);
        let before = data.clone();
        assert!(split_reviews(&mut data, 0).is_empty());
        assert_eq!(data, before);
    }

    proptest! {
        #[test]
        fn prop_split_bounded_and_disjoint(
            hunks in prop::collection::vec(prop::collection::vec(any::<bool>(), 0..6), 0..5),
            max in 0usize..6,
        ) {
            let mut counter = 0;
            let repos = hunks
                .iter()
                .enumerate()
                .map(|(r, flags)| {
                    let comments = flags
                        .iter()
                        .map(|has_hunk| {
                            counter += 1;
                            comment(&format!("c{counter}"), if *has_hunk { "@@" } else { "" })
                        })
                        .collect();
                    (["o/a", "o/b", "o/c", "o/d", "o/e"][r], comments)
                })
                .collect();
            let mut data = aggregate(repos);
            let total_before: usize = data.repos.iter().map(|r| r.review_comments.len()).sum();
            let with_hunks = hunks.iter().flatten().filter(|h| **h).count();

            let held_out = split_reviews(&mut data, max);

            prop_assert_eq!(held_out.len(), max.min(with_hunks));
            let total_after: usize = data.repos.iter().map(|r| r.review_comments.len()).sum();
            prop_assert_eq!(total_after + held_out.len(), total_before);
            for sample in &held_out {
                prop_assert!(!sample.diff_hunk.is_empty());
                let reappears = data
                    .repos
                    .iter()
                    .flat_map(|r| &r.review_comments)
                    .any(|c| c.body == sample.body);
                prop_assert!(!reappears);
            }
        }
    }
}

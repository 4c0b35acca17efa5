use crate::catalog::{Catalog, TemplateUnit};
use crate::compare::{structure_similarity, text_similarity};
use crate::node::ContentRow;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    #[default]
    Text,
    Structure,
    Both,
}

impl ScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Text => "text",
            ScoreMode::Structure => "structure",
            ScoreMode::Both => "both",
        }
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ScoreMode::Text),
            "structure" => Ok(ScoreMode::Structure),
            "both" => Ok(ScoreMode::Both),
            other => Err(Error::InvalidMode(format!(
                "{other:?} (allowed: text, structure, both)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankParams {
    pub mode: ScoreMode,
    /// Matches scoring below this are dropped; values above 100 filter everything.
    pub min_cutoff: u32,
    /// Restrict candidates to the group with this exact name; blank means all groups.
    pub group_filter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MatchRecord<'c> {
    pub group: &'c str,
    pub unit: &'c TemplateUnit,
    pub text_score: f64,
    pub structure_score: f64,
    /// The effective score for the active mode; the average in `Both`.
    pub combined_score: f64,
}

#[derive(Debug, Clone)]
pub struct RankedRow<'r, 'c> {
    pub row: &'r ContentRow,
    pub matches: Vec<MatchRecord<'c>>,
}

impl<'r, 'c> RankedRow<'r, 'c> {
    /// The (original row, replacement unit) pair handed to the persistence layer.
    pub fn pick(&self, match_index: usize) -> Option<(&'r ContentRow, &'c TemplateUnit)> {
        self.matches.get(match_index).map(|m| (self.row, m.unit))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "container": self.row.container,
            "position": self.row.position,
            "text": self.row.section.text,
            "matches": self.matches.iter().map(|m| serde_json::json!({
                "group": m.group,
                "template": m.unit.name(),
                "label": m.unit.marker().label(),
                "text_score": m.text_score,
                "structure_score": m.structure_score,
                "combined_score": m.combined_score,
            })).collect::<Vec<_>>(),
        })
    }
}

/// Score every row against every candidate unit and keep the ones at or above the cutoff.
///
/// Output order follows `rows`; each row's matches are sorted best-first, with ties left in
/// catalog order.
pub fn rank<'r, 'c>(
    rows: &'r [ContentRow],
    catalog: &'c Catalog,
    params: &RankParams,
) -> Vec<RankedRow<'r, 'c>> {
    let candidates: Vec<_> = catalog.units(params.group_filter.as_deref()).collect();
    let cutoff = f64::from(params.min_cutoff);

    rows.iter()
        .map(|row| {
            let mut matches: Vec<MatchRecord<'c>> = candidates
                .iter()
                .filter_map(|&(group, unit)| {
                    let content = unit.content();
                    let text_score = match params.mode {
                        ScoreMode::Text | ScoreMode::Both => text_similarity(&row.section, content),
                        ScoreMode::Structure => 0.0,
                    };
                    let structure_score = match params.mode {
                        ScoreMode::Structure | ScoreMode::Both => {
                            structure_similarity(&row.section, content)
                        }
                        ScoreMode::Text => 0.0,
                    };
                    let combined_score = match params.mode {
                        ScoreMode::Text => text_score,
                        ScoreMode::Structure => structure_score,
                        ScoreMode::Both => (text_score + structure_score) / 2.0,
                    };
                    (combined_score >= cutoff).then_some(MatchRecord {
                        group: group.name(),
                        unit,
                        text_score,
                        structure_score,
                        combined_score,
                    })
                })
                .collect();
            // `sort_by` is stable, which keeps equal scores in catalog order.
            matches.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
            RankedRow { row, matches }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateGroup;
    use crate::node::{Node, Section};

    fn section(text: &str, tags: &[&str]) -> Section {
        Section {
            tag: "tr".to_string(),
            text: text.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn unit(name: &str, label: &str, text: &str, tags: &[&str]) -> TemplateUnit {
        TemplateUnit::new(
            name,
            label,
            vec![
                Node::Comment(format!("{label} START")),
                Node::Element(section(text, tags)),
                Node::Comment(format!("{label} END")),
            ],
        )
        .unwrap()
    }

    fn group(name: &str, units: Vec<TemplateUnit>) -> TemplateGroup {
        let mut g = TemplateGroup::new(
            name,
            vec![
                Node::Comment("TEMPLATE GROUP TITLE START".to_string()),
                Node::Element(section(name, &[])),
                Node::Comment("TEMPLATE GROUP TITLE END".to_string()),
            ],
            None,
        )
        .unwrap();
        for u in units {
            g.add_unit(u);
        }
        g
    }

    fn row(position: usize, text: &str, tags: &[&str]) -> ContentRow {
        ContentRow {
            container: 0,
            position,
            section: section(text, tags),
        }
    }

    fn greeting_catalog() -> Catalog {
        Catalog::new(vec![group(
            "Greeting",
            vec![
                unit("Hi", "HI", "Hello there", &["td", "p"]),
                unit("Formal", "FORMAL", "Dear Sir", &["td", "p", "b"]),
            ],
        )])
    }

    fn names<'a>(r: &RankedRow<'_, 'a>) -> Vec<&'a str> {
        r.matches.iter().map(|m| m.unit.name()).collect()
    }

    #[test]
    fn text_mode_ranks_near_match_first() {
        let catalog = greeting_catalog();
        let rows = vec![row(0, "Hello ther", &["td", "p"])];

        let all = rank(
            &rows,
            &catalog,
            &RankParams {
                mode: ScoreMode::Text,
                min_cutoff: 0,
                group_filter: None,
            },
        );
        assert_eq!(names(&all[0]), vec!["Hi", "Formal"]);
        assert_eq!(all[0].matches[0].text_score, 95.0);
        assert_eq!(all[0].matches[0].combined_score, 95.0);
        assert_eq!(all[0].matches[0].structure_score, 0.0);
        assert!(all[0].matches[1].text_score < 50.0);
        assert_eq!(all[0].matches[0].group, "Greeting");

        let strict = rank(
            &rows,
            &catalog,
            &RankParams {
                mode: ScoreMode::Text,
                min_cutoff: 90,
                group_filter: None,
            },
        );
        assert_eq!(names(&strict[0]), vec!["Hi"]);
    }

    #[test]
    fn both_mode_with_zero_cutoff_keeps_every_candidate_sorted() {
        let catalog = greeting_catalog();
        let rows = vec![
            row(0, "Dear Sir", &["td", "p", "b"]),
            row(1, "zzz", &["div"]),
        ];
        let ranked = rank(
            &rows,
            &catalog,
            &RankParams {
                mode: ScoreMode::Both,
                min_cutoff: 0,
                group_filter: None,
            },
        );
        assert_eq!(ranked.len(), 2);
        for r in &ranked {
            assert_eq!(r.matches.len(), catalog.unit_count());
            for w in r.matches.windows(2) {
                assert!(w[0].combined_score >= w[1].combined_score);
            }
            for m in &r.matches {
                assert_eq!(m.combined_score, (m.text_score + m.structure_score) / 2.0);
            }
        }
        assert_eq!(names(&ranked[0]), vec!["Formal", "Hi"]);
        assert_eq!(ranked[0].matches[0].combined_score, 100.0);
    }

    #[test]
    fn ties_keep_catalog_order() {
        let catalog = Catalog::new(vec![group(
            "G",
            vec![
                unit("first", "A", "same", &["td"]),
                unit("second", "B", "same", &["td"]),
                unit("third", "C", "same", &["td"]),
            ],
        )]);
        let rows = vec![row(0, "same", &["td"])];
        let ranked = rank(
            &rows,
            &catalog,
            &RankParams {
                mode: ScoreMode::Structure,
                min_cutoff: 0,
                group_filter: None,
            },
        );
        assert_eq!(names(&ranked[0]), vec!["first", "second", "third"]);
        assert!(ranked[0].matches.iter().all(|m| m.text_score == 0.0));
    }

    #[test]
    fn unreachable_cutoff_empties_every_row() {
        let catalog = greeting_catalog();
        let rows = vec![row(0, "Hello there", &["td", "p"])];
        for mode in [ScoreMode::Text, ScoreMode::Structure, ScoreMode::Both] {
            let ranked = rank(
                &rows,
                &catalog,
                &RankParams {
                    mode,
                    min_cutoff: 101,
                    group_filter: None,
                },
            );
            assert!(ranked[0].matches.is_empty(), "{mode}");
        }
    }

    #[test]
    fn group_filter_restricts_candidates() {
        let catalog = Catalog::new(vec![
            group("Greeting", vec![unit("Hi", "HI", "Hello there", &["td"])]),
            group("Footer", vec![unit("Legal", "LEGAL", "Terms", &["td"])]),
        ]);
        let rows = vec![row(0, "Hello there", &["td"])];
        let params = |filter: Option<&str>| RankParams {
            mode: ScoreMode::Text,
            min_cutoff: 50,
            group_filter: filter.map(str::to_string),
        };

        assert_eq!(names(&rank(&rows, &catalog, &params(None))[0]), vec!["Hi"]);
        assert_eq!(names(&rank(&rows, &catalog, &params(Some("")))[0]), vec!["Hi"]);
        assert!(rank(&rows, &catalog, &params(Some("Footer")))[0]
            .matches
            .is_empty());
        assert!(rank(&rows, &catalog, &params(Some("Nope")))[0]
            .matches
            .is_empty());
    }

    #[test]
    fn filter_on_a_group_without_units_empties_every_row() {
        let catalog = Catalog::new(vec![
            group("Greeting", vec![unit("Hi", "HI", "Hello there", &["td"])]),
            group("Drafts", vec![]),
        ]);
        let rows = vec![
            row(0, "Hello there", &["td"]),
            row(1, "Hello ther", &["td"]),
        ];
        let params = |filter: Option<&str>| RankParams {
            mode: ScoreMode::Both,
            min_cutoff: 0,
            group_filter: filter.map(str::to_string),
        };

        let unfiltered = rank(&rows, &catalog, &params(None));
        assert!(unfiltered.iter().all(|r| !r.matches.is_empty()));

        let drafts = rank(&rows, &catalog, &params(Some("Drafts")));
        assert_eq!(drafts.len(), rows.len());
        assert!(drafts.iter().all(|r| r.matches.is_empty()));
    }

    #[test]
    fn pick_returns_row_and_unit() {
        let catalog = greeting_catalog();
        let rows = vec![row(3, "Hello ther", &["td", "p"])];
        let ranked = rank(&rows, &catalog, &RankParams::default());
        let (original, replacement) = ranked[0].pick(0).unwrap();
        assert_eq!(original.position, 3);
        assert_eq!(replacement.name(), "Hi");
        assert!(ranked[0].pick(9).is_none());

        let v = ranked[0].to_json();
        assert_eq!(v["matches"][0]["template"], "Hi");
        assert_eq!(v["matches"][0]["combined_score"], 95.0);
    }

    #[test]
    fn score_mode_parses_known_names_only() {
        assert_eq!("TEXT".parse::<ScoreMode>().unwrap(), ScoreMode::Text);
        assert_eq!(" both ".parse::<ScoreMode>().unwrap(), ScoreMode::Both);
        assert_eq!(
            "structure".parse::<ScoreMode>().unwrap(),
            ScoreMode::Structure
        );
        assert!(matches!(
            "fuzzy".parse::<ScoreMode>(),
            Err(Error::InvalidMode(_))
        ));
    }
}

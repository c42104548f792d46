use crate::validation::pattern::parse_date;
use crate::validation::{NormalizedFields, Pattern, RequestInput, Resolved, RuleSet};

use super::error::FilterError;
use super::filter_order::{FilterOrder, SortDirection};
use super::filter_where::{FilterWhere, Predicate};
use super::tags::TagSet;
use super::types::{DateFilter, SqlResult};

/// Value of `emotion_idx` meaning "no category filter"
pub const CATEGORY_NOT_SUPPLIED: i64 = -1;

const PROJECTION: &str = "SELECT D.idx, D.title, D.content, D.emotion_idx, \
     TO_CHAR(D.date, 'YYYY-MM-DD') AS date, \
     ARRAY(SELECT name FROM diary_tag WHERE diary_idx = D.idx ORDER BY name) AS tag \
     FROM diary D";

/// Ruleset for the search query string. Everything is optional; `sort` is
/// read leniently by [`DiaryFilter::from_fields`] and never rejected.
pub fn search_rules() -> RuleSet {
    RuleSet::optional()
        .rule(Pattern::QueryId, &["emotion_idx"])
        .rule(Pattern::Date, &["date", "start", "end"])
}

/// Search over one owner's diaries
#[derive(Debug, Clone, PartialEq)]
pub struct DiaryFilter {
    owner: i64,
    date: Option<DateFilter>,
    category: Option<i64>,
    tags: TagSet,
    sort: SortDirection,
}

impl DiaryFilter {
    pub fn new(owner: i64) -> Self {
        Self { owner, date: None, category: None, tags: TagSet::default(), sort: SortDirection::default() }
    }

    /// Build from fields normalized by [`search_rules`] plus the raw tag and
    /// sort values of the request. Tags are checked here, before any SQL exists.
    pub fn from_fields(owner: i64, fields: &NormalizedFields, input: &RequestInput) -> Result<Self, FilterError> {
        let tags = TagSet::parse(input.values("tag"))?;
        let sort = match input.resolve("sort") {
            Some((_, Resolved::Text(text))) => SortDirection::from_text(Some(&text)),
            _ => SortDirection::Desc,
        };
        let date = Self::resolve_date(fields.str("date"), fields.str("start"), fields.str("end"))?;
        let category = fields.i64("emotion_idx").filter(|&idx| idx != CATEGORY_NOT_SUPPLIED);

        Ok(Self {
            owner,
            date,
            category,
            tags,
            sort,
        })
    }

    /// Exact date wins over a range; a range needs both ends
    fn resolve_date(date: Option<&str>, start: Option<&str>, end: Option<&str>) -> Result<Option<DateFilter>, FilterError> {
        if let Some(date) = date {
            return Ok(Some(DateFilter::On(date.to_string())));
        }
        match (start, end) {
            (Some(start), Some(end)) => {
                if let (Some(from), Some(to)) = (parse_date(start), parse_date(end)) {
                    if from > to {
                        return Err(FilterError::InvalidDateRange { start: start.to_string(), end: end.to_string() });
                    }
                }
                Ok(Some(DateFilter::Between { start: start.to_string(), end: end.to_string() }))
            }
            _ => Ok(None),
        }
    }

    pub fn date(mut self, date: Option<DateFilter>) -> Self {
        self.date = date;
        self
    }

    pub fn category(mut self, category: Option<i64>) -> Self {
        self.category = category;
        self
    }

    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn sort(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    /// Predicates in composition order; the owner scope is always first
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = vec![Predicate::Owner(self.owner)];
        match &self.date {
            Some(DateFilter::On(date)) => predicates.push(Predicate::DateOn(date.clone())),
            Some(DateFilter::Between { start, end }) => {
                predicates.push(Predicate::DateBetween { start: start.clone(), end: end.clone() })
            }
            None => {}
        }
        if let Some(category) = self.category {
            predicates.push(Predicate::Category(category));
        }
        if !self.tags.is_empty() {
            predicates.push(Predicate::Tags(self.tags.clone()));
        }
        predicates
    }

    pub fn to_sql(&self) -> SqlResult {
        let parts = self
            .predicates()
            .into_iter()
            .fold(FilterWhere::new(), FilterWhere::push)
            .finish();

        let query = [
            PROJECTION.to_string(),
            parts.joins.join(" "),
            format!("WHERE {}", parts.conditions.join(" AND ")),
            FilterOrder::generate(&["D.date", "D.idx"], self.sort),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params: parts.params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn filter_for(query: &str) -> Result<DiaryFilter, FilterError> {
        let input = RequestInput::new().with_query(Some(query));
        let fields = search_rules().validate(&input).expect("valid search query");
        DiaryFilter::from_fields(1, &fields, &input)
    }

    fn sql_for(query: &str) -> SqlResult {
        filter_for(query).unwrap().to_sql()
    }

    #[test]
    fn bare_search_scopes_to_owner() {
        let sql = sql_for("");
        assert_eq!(
            sql.query,
            format!("{} WHERE D.user_idx = $1 ORDER BY D.date DESC, D.idx DESC", PROJECTION)
        );
        assert_eq!(sql.params, vec![Value::from(1)]);
    }

    #[test]
    fn exact_date_beats_range() {
        let sql = sql_for("date=2025-01-02&start=2025-01-01&end=2025-01-31");
        assert!(sql.query.contains("D.date = $2::date"));
        assert!(!sql.query.contains("BETWEEN"));
        assert_eq!(sql.params, vec![Value::from(1), Value::from("2025-01-02")]);
    }

    #[test]
    fn half_open_range_is_ignored() {
        let sql = sql_for("start=2025-01-01");
        assert!(!sql.query.contains("D.date ="));
        assert!(!sql.query.contains("BETWEEN"));
        assert_eq!(sql.params.len(), 1);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = filter_for("start=2025-02-01&end=2025-01-01").unwrap_err();
        assert!(matches!(err, FilterError::InvalidDateRange { .. }));
    }

    #[test]
    fn category_sentinel_adds_no_predicate() {
        let sql = sql_for("emotion_idx=-1");
        assert!(!sql.query.contains("emotion_idx ="));
        assert_eq!(sql.params.len(), 1);

        let sql = sql_for("emotion_idx=4");
        assert!(sql.query.contains("D.emotion_idx = $2"));
        assert_eq!(sql.params[1], Value::from(4));
    }

    #[test]
    fn sort_code_two_is_ascending() {
        assert!(sql_for("sort=2").query.ends_with("ORDER BY D.date ASC, D.idx ASC"));
        assert!(sql_for("sort=1").query.ends_with("ORDER BY D.date DESC, D.idx DESC"));
    }

    #[test]
    fn other_sort_values_fall_back_to_descending() {
        for query in ["sort=-1", "sort=0", "sort=abc", "sort=99999999999999999999", "sort="] {
            assert!(
                sql_for(query).query.ends_with("ORDER BY D.date DESC, D.idx DESC"),
                "query: {}",
                query
            );
        }
    }

    #[test]
    fn repeated_date_uses_first_non_empty_value() {
        let sql = sql_for("date=&date=2025-01-02");
        assert!(sql.query.contains("D.date = $2::date"));
        assert_eq!(sql.params, vec![Value::from(1), Value::from("2025-01-02")]);
    }

    #[test]
    fn invalid_tag_stops_before_sql() {
        let err = filter_for("tag=ok&tag=bad%20tag").unwrap_err();
        assert_eq!(err, FilterError::InvalidTag("bad tag".to_string()));
    }

    #[test]
    fn full_search_keeps_placeholders_aligned() {
        let sql = sql_for("start=2025-01-01&end=2025-01-31&emotion_idx=2&tag=%23a&tag=b&sort=2");
        assert!(sql.query.contains("D.date BETWEEN $2::date AND $3::date"));
        assert!(sql.query.contains("D.emotion_idx = $4"));
        assert!(sql.query.contains("HAVING COUNT(*) = 2 AND BOOL_AND(name IN ($5, $6))"));
        assert_eq!(
            sql.params,
            vec![
                Value::from(1),
                Value::from("2025-01-01"),
                Value::from("2025-01-31"),
                Value::from(2),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn placeholder_count_matches_params_for_every_combination() {
        let dates = [None, Some("date=2025-01-02"), Some("start=2025-01-01&end=2025-01-09"), Some("start=2025-01-01")];
        let categories = [None, Some("emotion_idx=-1"), Some("emotion_idx=3")];
        let tags = [None, Some("tag=a"), Some("tag=a&tag=b&tag=c")];
        let sorts = [None, Some("sort=2"), Some("sort=5"), Some("sort=-1")];

        for d in dates {
            for c in categories {
                for t in tags {
                    for s in sorts {
                        let query = [d, c, t, s].into_iter().flatten().collect::<Vec<_>>().join("&");
                        let sql = sql_for(&query);
                        assert_eq!(sql.max_placeholder(), sql.params.len(), "query: {}", query);
                    }
                }
            }
        }
    }

    #[test]
    fn builder_methods_compose() {
        let sql = DiaryFilter::new(9)
            .category(Some(2))
            .date(Some(DateFilter::On("20250105".into())))
            .sort(SortDirection::Asc)
            .to_sql();
        assert!(sql.query.contains("D.user_idx = $1 AND D.date = $2::date AND D.emotion_idx = $3"));
        assert_eq!(sql.params, vec![Value::from(9), Value::from("20250105"), Value::from(2)]);
    }
}

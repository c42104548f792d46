/// Sort direction on the diary date column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Code sent by clients: `2` sorts oldest first, anything else newest first
    pub const ASC_CODE: i64 = 2;

    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(Self::ASC_CODE) => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    /// Lenient reading of the raw `sort` value. Anything that is not a
    /// readable code falls back to descending.
    pub fn from_text(text: Option<&str>) -> Self {
        Self::from_code(text.and_then(|text| text.trim().parse::<i64>().ok()))
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

pub struct FilterOrder;

impl FilterOrder {
    /// `ORDER BY` over the given columns, all in one direction
    pub fn generate(columns: &[&str], direction: SortDirection) -> String {
        let parts: Vec<String> = columns
            .iter()
            .map(|column| format!("{} {}", column, direction.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_code_two_is_ascending() {
        assert_eq!(SortDirection::from_code(Some(2)), SortDirection::Asc);
        assert_eq!(SortDirection::from_code(Some(1)), SortDirection::Desc);
        assert_eq!(SortDirection::from_code(Some(3)), SortDirection::Desc);
        assert_eq!(SortDirection::from_code(Some(-1)), SortDirection::Desc);
        assert_eq!(SortDirection::from_code(None), SortDirection::Desc);
    }

    #[test]
    fn unreadable_text_is_descending() {
        assert_eq!(SortDirection::from_text(Some("2")), SortDirection::Asc);
        assert_eq!(SortDirection::from_text(Some("02")), SortDirection::Asc);
        assert_eq!(SortDirection::from_text(Some("-1")), SortDirection::Desc);
        assert_eq!(SortDirection::from_text(Some("0")), SortDirection::Desc);
        assert_eq!(SortDirection::from_text(Some("abc")), SortDirection::Desc);
        assert_eq!(SortDirection::from_text(Some("99999999999999999999")), SortDirection::Desc);
        assert_eq!(SortDirection::from_text(None), SortDirection::Desc);
    }

    #[test]
    fn generates_order_clause() {
        assert_eq!(
            FilterOrder::generate(&["D.date", "D.idx"], SortDirection::Asc),
            "ORDER BY D.date ASC, D.idx ASC"
        );
    }
}

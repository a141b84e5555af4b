use crate::domain::property::Property;
use crate::error::{BookingError, Result};

/// Public farmhouse search filters. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub search: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl PropertyFilter {
    pub fn validate(&self) -> Result<()> {
        for (name, price) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(p) = price
                && (p < 0.0 || !p.is_finite())
            {
                return Err(BookingError::validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }

        if let Some(min) = self.min_price
            && let Some(max) = self.max_price
            && min > max
        {
            return Err(BookingError::validation(
                "min_price cannot be greater than max_price",
            ));
        }

        Ok(())
    }

    /// Match against one listing. Text filters are case-insensitive substrings;
    /// price bounds apply to the farmhouse base price.
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(city) = non_blank(self.city.as_deref())
            && !contains_ci(&property.address.city, city)
        {
            return false;
        }
        if let Some(state) = non_blank(self.state.as_deref())
            && !contains_ci(&property.address.state, state)
        {
            return false;
        }
        if let Some(min) = self.min_price
            && property.pricing.base_price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && property.pricing.base_price > max
        {
            return false;
        }
        if let Some(text) = non_blank(self.search.as_deref()) {
            let haystacks = [
                property.name.as_str(),
                property.description.as_str(),
                property.address.city.as_str(),
                property.address.state.as_str(),
            ];
            if !haystacks.iter().any(|h| contains_ci(h, text)) {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_property;
    use uuid::Uuid;

    #[test]
    fn empty_filter_matches_everything() {
        let property = make_property(Uuid::new_v4());
        let filter = PropertyFilter::default();
        assert!(filter.validate().is_ok());
        assert!(filter.matches(&property));
    }

    #[test]
    fn city_filter_is_case_insensitive() {
        let property = make_property(Uuid::new_v4());
        let filter = PropertyFilter {
            city: Some("lonAV".into()),
            ..PropertyFilter::default()
        };
        assert!(filter.matches(&property));
        let filter = PropertyFilter {
            city: Some("Goa".into()),
            ..PropertyFilter::default()
        };
        assert!(!filter.matches(&property));
    }

    #[test]
    fn price_bounds_use_base_price() {
        let property = make_property(Uuid::new_v4());
        let within = PropertyFilter {
            min_price: Some(100.0),
            max_price: Some(200.0),
            ..PropertyFilter::default()
        };
        assert!(within.matches(&property));
        let above = PropertyFilter {
            min_price: Some(250.0),
            ..PropertyFilter::default()
        };
        assert!(!above.matches(&property));
    }

    #[test]
    fn free_text_searches_name_and_description() {
        let property = make_property(Uuid::new_v4());
        let filter = PropertyFilter {
            search: Some("green acres".into()),
            ..PropertyFilter::default()
        };
        assert!(filter.matches(&property));
        let filter = PropertyFilter {
            search: Some("houseboat".into()),
            ..PropertyFilter::default()
        };
        assert!(!filter.matches(&property));
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let filter = PropertyFilter {
            min_price: Some(500.0),
            max_price: Some(100.0),
            ..PropertyFilter::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let filter = PropertyFilter {
            min_price: Some(-1.0),
            ..PropertyFilter::default()
        };
        let err = filter.validate().unwrap_err();
        assert!(err.to_string().contains("min_price"));
    }
}

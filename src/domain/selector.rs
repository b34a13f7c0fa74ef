//! Machine-readable selectors carried by inline menu buttons.
//!
//! Encoded as `tag` or `tag:payload` in callback data and decoded once at the
//! transport boundary. Only the first `:` separates tag from payload, so type
//! names may themselves contain `:`.

/// Telegram's limit on callback data, in bytes.
pub const MAX_CALLBACK_DATA: usize = 64;

/// Report period chosen from the statistics menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Week,
    Month,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsKind {
    MostProfitable,
    MostSold,
    Weekday,
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    AddPie { pie_type: String },
    EnterRemaining { pie_type: String },
    WriteOff { pie_type: String },
    SetPrice { pie_type: String },
    StatsPeriod(Period),
    AnalyticsMenu,
    Analytics(AnalyticsKind),
    BackToMain,
    BackToStats,
    /// Inert entry shown when a menu has nothing to offer.
    Placeholder,
}

impl Selector {
    pub fn encode(&self) -> String {
        match self {
            Selector::AddPie { pie_type } => format!("add:{pie_type}"),
            Selector::EnterRemaining { pie_type } => format!("rem:{pie_type}"),
            Selector::WriteOff { pie_type } => format!("off:{pie_type}"),
            Selector::SetPrice { pie_type } => format!("price:{pie_type}"),
            Selector::StatsPeriod(p) => format!(
                "stats:{}",
                match p {
                    Period::Today => "today",
                    Period::Week => "week",
                    Period::Month => "month",
                    Period::Custom => "custom",
                }
            ),
            Selector::AnalyticsMenu => "analytics".to_string(),
            Selector::Analytics(kind) => format!(
                "an:{}",
                match kind {
                    AnalyticsKind::MostProfitable => "profit",
                    AnalyticsKind::MostSold => "sold",
                    AnalyticsKind::Weekday => "weekday",
                    AnalyticsKind::Forecast => "forecast",
                }
            ),
            Selector::BackToMain => "back".to_string(),
            Selector::BackToStats => "back_stats".to_string(),
            Selector::Placeholder => "noop".to_string(),
        }
    }

    /// Every selector built around `pie_type`.
    pub fn for_type(pie_type: &str) -> [Selector; 4] {
        let pie_type = pie_type.to_string();
        [
            Selector::AddPie {
                pie_type: pie_type.clone(),
            },
            Selector::EnterRemaining {
                pie_type: pie_type.clone(),
            },
            Selector::WriteOff {
                pie_type: pie_type.clone(),
            },
            Selector::SetPrice { pie_type },
        ]
    }

    /// Whether the encoded form fits in a button's callback data.
    pub fn fits_callback_data(&self) -> bool {
        self.encode().len() <= MAX_CALLBACK_DATA
    }

    /// Returns `None` for unknown or malformed payloads.
    pub fn decode(raw: &str) -> Option<Selector> {
        let (tag, payload) = match raw.split_once(':') {
            Some((tag, payload)) => (tag, Some(payload)),
            None => (raw, None),
        };
        let pie_type = || payload.filter(|p| !p.is_empty()).map(str::to_string);

        match tag {
            "add" => pie_type().map(|pie_type| Selector::AddPie { pie_type }),
            "rem" => pie_type().map(|pie_type| Selector::EnterRemaining { pie_type }),
            "off" => pie_type().map(|pie_type| Selector::WriteOff { pie_type }),
            "price" => pie_type().map(|pie_type| Selector::SetPrice { pie_type }),
            "stats" => match payload? {
                "today" => Some(Selector::StatsPeriod(Period::Today)),
                "week" => Some(Selector::StatsPeriod(Period::Week)),
                "month" => Some(Selector::StatsPeriod(Period::Month)),
                "custom" => Some(Selector::StatsPeriod(Period::Custom)),
                _ => None,
            },
            "analytics" if payload.is_none() => Some(Selector::AnalyticsMenu),
            "an" => match payload? {
                "profit" => Some(Selector::Analytics(AnalyticsKind::MostProfitable)),
                "sold" => Some(Selector::Analytics(AnalyticsKind::MostSold)),
                "weekday" => Some(Selector::Analytics(AnalyticsKind::Weekday)),
                "forecast" => Some(Selector::Analytics(AnalyticsKind::Forecast)),
                _ => None,
            },
            "back" if payload.is_none() => Some(Selector::BackToMain),
            "back_stats" if payload.is_none() => Some(Selector::BackToStats),
            "noop" if payload.is_none() => Some(Selector::Placeholder),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_typed_payload() {
        assert_eq!(
            Selector::decode("add:Sausage roll"),
            Some(Selector::AddPie {
                pie_type: "Sausage roll".into()
            })
        );
        assert_eq!(
            Selector::decode("off:a:b"),
            Some(Selector::WriteOff {
                pie_type: "a:b".into()
            })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_and_empty() {
        assert_eq!(Selector::decode("add:"), None);
        assert_eq!(Selector::decode("add"), None);
        assert_eq!(Selector::decode("stats:year"), None);
        assert_eq!(Selector::decode("back:extra"), None);
        assert_eq!(Selector::decode("add_pie_Meat"), None);
        assert_eq!(Selector::decode(""), None);
    }

    #[test]
    fn test_callback_data_limit_counts_bytes() {
        let ascii = "x".repeat(58);
        assert!(Selector::for_type(&ascii).iter().all(Selector::fits_callback_data));

        let longer = "x".repeat(59);
        let fits: Vec<bool> = Selector::for_type(&longer)
            .iter()
            .map(Selector::fits_callback_data)
            .collect();
        assert_eq!(fits, vec![true, true, true, false]);

        // 31 Cyrillic letters are 62 bytes.
        let cyrillic = "п".repeat(31);
        assert!(!Selector::AddPie { pie_type: cyrillic }.fits_callback_data());
    }

    #[test]
    fn test_encoded_menu_selectors_decode_back() {
        let selectors = [
            Selector::SetPrice {
                pie_type: "Мясо".into(),
            },
            Selector::StatsPeriod(Period::Custom),
            Selector::Analytics(AnalyticsKind::Forecast),
            Selector::AnalyticsMenu,
            Selector::BackToStats,
            Selector::Placeholder,
        ];
        for s in selectors {
            assert_eq!(Selector::decode(&s.encode()), Some(s));
        }
    }
}

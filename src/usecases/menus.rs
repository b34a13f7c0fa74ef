//! Inline menu builders. Pure functions of freshly fetched per-chat data.

use crate::domain::{AnalyticsKind, DailyLog, Menu, MenuButton, Period, PriceTable, Selector};
use crate::shared::{format_count, format_number};
use std::collections::HashMap;

pub const BACK_LABEL: &str = "🔙 Back";
pub const BACK_TO_MAIN_LABEL: &str = "🔙 Back to main menu";
pub const NOTHING_TO_ENTER_LABEL: &str = "Add baked pies first";
pub const NOTHING_TO_WRITE_OFF_LABEL: &str = "No stock left to write off";

fn back_to_main() -> MenuButton {
    MenuButton::new(BACK_TO_MAIN_LABEL, Selector::BackToMain)
}

/// Type picker for adding baked pies.
pub fn pie_types_menu(pie_types: &[String]) -> Menu {
    pie_types
        .iter()
        .fold(Menu::empty(), |menu, t| {
            menu.single(MenuButton::new(
                t.clone(),
                Selector::AddPie {
                    pie_type: t.clone(),
                },
            ))
        })
        .single(MenuButton::new(BACK_LABEL, Selector::BackToMain))
}

/// One entry per configured type with its current price.
pub fn settings_menu(pie_types: &[String], prices: &PriceTable, currency: &str) -> Menu {
    pie_types
        .iter()
        .fold(Menu::empty(), |menu, t| {
            let price = if prices.is_set(t) {
                format!("({} {})", format_number(prices.price_of(t)), currency)
            } else {
                "(not set)".to_string()
            };
            menu.single(MenuButton::new(
                format!("💲 {t} {price}"),
                Selector::SetPrice {
                    pie_type: t.clone(),
                },
            ))
        })
        .single(back_to_main())
}

/// Types baked today, with manufactured and remaining counts.
pub fn remaining_menu(pie_types: &[String], logs: &HashMap<String, DailyLog>) -> Menu {
    let mut menu = Menu::empty();
    let mut any = false;
    for t in pie_types {
        let Some(log) = logs.get(t).filter(|l| l.manufactured > 0) else {
            continue;
        };
        let remaining = log
            .remaining
            .map(format_count)
            .unwrap_or_else(|| "not entered".to_string());
        menu = menu.single(MenuButton::new(
            format!("📦 {t} ({} / {remaining})", format_count(log.manufactured)),
            Selector::EnterRemaining {
                pie_type: t.clone(),
            },
        ));
        any = true;
    }
    if !any {
        menu = menu.single(MenuButton::new(
            NOTHING_TO_ENTER_LABEL,
            Selector::Placeholder,
        ));
    }
    menu.single(back_to_main())
}

/// Types with stock left today. Nothing to offer yields a lone placeholder.
pub fn write_off_menu(pie_types: &[String], logs: &HashMap<String, DailyLog>) -> Menu {
    let buttons: Vec<MenuButton> = pie_types
        .iter()
        .filter_map(|t| {
            let log = logs.get(t)?;
            let remaining = log.remaining_or_zero();
            (remaining > 0).then(|| {
                MenuButton::new(
                    format!(
                        "🗑️ {t} (remaining: {}, written off: {})",
                        format_count(remaining),
                        format_count(log.written_off)
                    ),
                    Selector::WriteOff {
                        pie_type: t.clone(),
                    },
                )
            })
        })
        .collect();

    if buttons.is_empty() {
        return Menu::empty().single(MenuButton::new(
            NOTHING_TO_WRITE_OFF_LABEL,
            Selector::Placeholder,
        ));
    }
    buttons
        .into_iter()
        .fold(Menu::empty(), Menu::single)
        .single(back_to_main())
}

pub fn stats_period_menu() -> Menu {
    Menu::empty()
        .row(vec![
            MenuButton::new("📈 Today", Selector::StatsPeriod(Period::Today)),
            MenuButton::new("📅 Week", Selector::StatsPeriod(Period::Week)),
        ])
        .row(vec![
            MenuButton::new("🗓️ Month", Selector::StatsPeriod(Period::Month)),
            MenuButton::new("✍️ Custom dates", Selector::StatsPeriod(Period::Custom)),
        ])
        .single(MenuButton::new("🧠 Analytics", Selector::AnalyticsMenu))
        .single(MenuButton::new(BACK_LABEL, Selector::BackToMain))
}

pub fn analytics_menu() -> Menu {
    Menu::empty()
        .single(MenuButton::new(
            "🏆 Most profitable pie",
            Selector::Analytics(AnalyticsKind::MostProfitable),
        ))
        .single(MenuButton::new(
            "📈 Best-selling pie",
            Selector::Analytics(AnalyticsKind::MostSold),
        ))
        .single(MenuButton::new(
            "📅 Sales by weekday",
            Selector::Analytics(AnalyticsKind::Weekday),
        ))
        .single(MenuButton::new(
            "🔮 Forecast for tomorrow",
            Selector::Analytics(AnalyticsKind::Forecast),
        ))
        .single(MenuButton::new(
            "🔙 Back to statistics",
            Selector::BackToStats,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> Vec<String> {
        vec!["Meat".into(), "Potato".into(), "Sausage roll".into()]
    }

    fn labels(menu: &Menu) -> Vec<&str> {
        menu.buttons().map(|b| b.label.as_str()).collect()
    }

    #[test]
    fn test_settings_menu_shows_prices() {
        let mut prices = PriceTable::new();
        prices.set("Meat", 1500.0);

        let menu = settings_menu(&types(), &prices, "sum");

        assert_eq!(
            labels(&menu),
            vec![
                "💲 Meat (1\u{a0}500 sum)",
                "💲 Potato (not set)",
                "💲 Sausage roll (not set)",
                BACK_TO_MAIN_LABEL,
            ]
        );
    }

    #[test]
    fn test_remaining_menu_lists_only_baked_types() {
        let mut logs = HashMap::new();
        logs.insert(
            "Potato".to_string(),
            DailyLog {
                manufactured: 15,
                remaining: None,
                written_off: 0,
            },
        );
        logs.insert(
            "Meat".to_string(),
            DailyLog {
                manufactured: 25,
                remaining: Some(4),
                written_off: 0,
            },
        );

        let menu = remaining_menu(&types(), &logs);

        assert_eq!(
            labels(&menu),
            vec![
                "📦 Meat (25 / 4)",
                "📦 Potato (15 / not entered)",
                BACK_TO_MAIN_LABEL,
            ]
        );
    }

    #[test]
    fn test_remaining_menu_empty_has_placeholder_and_back() {
        let menu = remaining_menu(&types(), &HashMap::new());
        let selectors: Vec<_> = menu.buttons().map(|b| b.selector.clone()).collect();
        assert_eq!(selectors, vec![Selector::Placeholder, Selector::BackToMain]);
    }

    #[test]
    fn test_write_off_menu_skips_empty_stock() {
        let mut logs = HashMap::new();
        logs.insert(
            "Meat".to_string(),
            DailyLog {
                manufactured: 25,
                remaining: Some(0),
                written_off: 2,
            },
        );
        logs.insert(
            "Potato".to_string(),
            DailyLog {
                manufactured: 15,
                remaining: Some(3),
                written_off: 1,
            },
        );

        let menu = write_off_menu(&types(), &logs);

        assert_eq!(
            labels(&menu),
            vec![
                "🗑️ Potato (remaining: 3, written off: 1)",
                BACK_TO_MAIN_LABEL,
            ]
        );
    }

    #[test]
    fn test_write_off_menu_empty_is_single_placeholder() {
        let menu = write_off_menu(&types(), &HashMap::new());
        assert_eq!(menu.rows.len(), 1);
        assert_eq!(menu.rows[0][0].selector, Selector::Placeholder);
    }

    #[test]
    fn test_pie_types_menu() {
        let menu = pie_types_menu(&types());
        assert_eq!(menu.rows.len(), 4);
        assert_eq!(
            menu.rows[2][0].selector,
            Selector::AddPie {
                pie_type: "Sausage roll".into()
            }
        );
    }
}

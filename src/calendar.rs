/// Gregorian month names mapped to the Solar Hijri month that begins inside them.
pub const GREGORIAN_TO_SOLAR: [(&str, &str); 12] = [
    ("January", "دی"),
    ("February", "بهمن"),
    ("March", "اسفند"),
    ("April", "فروردین"),
    ("May", "اردیبهشت"),
    ("June", "خرداد"),
    ("July", "تیر"),
    ("August", "مرداد"),
    ("September", "شهریور"),
    ("October", "مهر"),
    ("November", "آبان"),
    ("December", "آذر"),
];

/// Solar Hijri months in calendar order, starting at Farvardin.
pub const SOLAR_MONTHS: [&str; 12] = [
    "فروردین",
    "اردیبهشت",
    "خرداد",
    "تیر",
    "مرداد",
    "شهریور",
    "مهر",
    "آبان",
    "آذر",
    "دی",
    "بهمن",
    "اسفند",
];

/// Unknown labels come back unchanged.
pub fn translate(label: &str) -> &str {
    GREGORIAN_TO_SOLAR
        .iter()
        .find(|(gregorian, _)| *gregorian == label)
        .map(|(_, solar)| *solar)
        .unwrap_or(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_every_gregorian_month() {
        let expected = [
            ("January", "دی"),
            ("February", "بهمن"),
            ("March", "اسفند"),
            ("April", "فروردین"),
            ("May", "اردیبهشت"),
            ("June", "خرداد"),
            ("July", "تیر"),
            ("August", "مرداد"),
            ("September", "شهریور"),
            ("October", "مهر"),
            ("November", "آبان"),
            ("December", "آذر"),
        ];
        for (gregorian, solar) in expected {
            assert_eq!(translate(gregorian), solar, "{gregorian}");
        }
    }

    #[test]
    fn unknown_labels_pass_through() {
        assert_eq!(translate("NotAMonth"), "NotAMonth");
        assert_eq!(translate("january"), "january");
        assert_eq!(translate(""), "");
    }

    #[test]
    fn table_covers_each_solar_month_once() {
        for month in SOLAR_MONTHS {
            let hits = GREGORIAN_TO_SOLAR
                .iter()
                .filter(|(_, solar)| *solar == month)
                .count();
            assert_eq!(hits, 1, "{month}");
        }
    }

    #[test]
    fn adjacent_gregorian_months_stay_adjacent() {
        for pair in GREGORIAN_TO_SOLAR.windows(2) {
            let current = SOLAR_MONTHS.iter().position(|m| *m == pair[0].1).unwrap();
            let next = SOLAR_MONTHS.iter().position(|m| *m == pair[1].1).unwrap();
            assert_eq!((current + 1) % 12, next);
        }
    }
}

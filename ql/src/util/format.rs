use num_format::{CustomFormat, Grouping};

pub fn number_format() -> CustomFormat {
    CustomFormat::builder()
        .grouping(Grouping::Standard)
        .minus_sign("-")
        .separator("_")
        .build()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use num_format::ToFormattedString;

    use super::*;

    #[test]
    fn test_number_format() {
        assert_eq!(1_234_567.to_formatted_string(&number_format()), "1_234_567");
        assert_eq!(999.to_formatted_string(&number_format()), "999");
    }
}

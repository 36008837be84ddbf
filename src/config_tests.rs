//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.data_dir.to_str().unwrap(), "betting_data");
        assert_eq!(config.matcher.threshold, 85.0);
        assert_eq!(config.trainer.min_samples, 50);
        assert_eq!(config.trainer.min_market_samples, 30);
        assert_eq!(config.betting.stake, dec!(10));
        assert!(config.database.analytics_path.is_none());
    }

    #[test]
    fn test_partial_section_keeps_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [selector]
            home_over_min_odds = 1.40
            "#,
        )
        .unwrap();
        assert_eq!(config.selector.home_over_min_odds, 1.40);
        assert_eq!(config.selector.home_draw_min_odds, 1.35);
        assert_eq!(config.selector.over_15_min_odds, 1.35);
        assert_eq!(config.selector.double_chance_min_prob, 0.70);
    }

    #[test]
    fn test_scraper_overrides_parse() {
        let config: Config = toml::from_str(
            r#"
            [scraper]
            odds_base_url = "http://localhost:9000"
            max_retries = 5
            min_delay_ms = 0
            max_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.scraper.odds_base_url, "http://localhost:9000");
        assert_eq!(config.scraper.max_retries, 5);
        assert_eq!(config.scraper.max_delay_ms, 0);
        assert_eq!(config.scraper.timeout_secs, 30);
    }

    #[test]
    fn test_trainer_overrides_parse() {
        let config: Config = toml::from_str(
            r#"
            [trainer]
            num_rounds = 50
            learning_rate = 0.1
            test_size = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.trainer.num_rounds, 50);
        assert_eq!(config.trainer.learning_rate, 0.1);
        assert_eq!(config.trainer.test_size, 0.2);
        assert_eq!(config.trainer.early_stopping_rounds, 20);
    }

    #[test]
    fn test_betting_stake_parses_as_decimal() {
        let config: Config = toml::from_str(
            r#"
            [betting]
            stake = "2.50"
            max_bets = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.betting.stake, dec!(2.50));
        assert_eq!(config.betting.max_bets, 5);
    }

    #[test]
    fn test_model_dir_defaults_under_data_dir() {
        let config: Config = toml::from_str("data_dir = \"/tmp/bf\"").unwrap();
        assert_eq!(config.model_dir().to_str().unwrap(), "/tmp/bf/models");

        let config: Config = toml::from_str("model_dir = \"/var/models\"").unwrap();
        assert_eq!(config.model_dir().to_str().unwrap(), "/var/models");
    }

    #[test]
    fn test_database_paths_parse() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "prod.db"
            analytics_path = "analytics.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, "prod.db");
        assert_eq!(config.database.analytics_path.as_deref(), Some("analytics.db"));
    }
}

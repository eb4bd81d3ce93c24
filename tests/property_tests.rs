//! Property-based tests for query building and input normalization
//!
//! These tests verify, for arbitrary filter combinations, that:
//! - Every placeholder in the built SQL has exactly one parameter
//! - Absent or blank filters leave the base query untouched
//! - Code lists survive parsing and bind one parameter per code
//! - Normalization is idempotent and removes what it folds

#[cfg(test)]
mod tests {
    use legacy_dao::core::db::{count_placeholders, parse_code_list, Dialect, QueryBuilder, Value};
    use legacy_dao::students::normalize::normalize_str;
    use legacy_dao::students::validation::verify_cpf;
    use proptest::prelude::*;

    const BASE: &str = "select dpd.dpd_cod_dependente from tpu_dependentes_dpd dpd";

    fn arb_dialect() -> impl Strategy<Value = Dialect> {
        prop_oneof![
            Just(Dialect::Oracle),
            Just(Dialect::SqlServer),
            Just(Dialect::Sqlite)
        ]
    }

    /// Filter input: absent, blank, or text that may contain quotes and `?`.
    fn arb_filter() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("   ".to_string())),
            "[a-zA-Z0-9 '?%]{1,12}".prop_map(Some),
        ]
    }

    fn arb_initials() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[A-Z ]{0,2}", 0..5)
    }

    fn build(
        dialect: Dialect,
        name: &Option<String>,
        cpf: &Option<String>,
        mother: &Option<String>,
        initials: &[String],
        codes: &[String],
    ) -> legacy_dao::core::db::BuiltQuery {
        QueryBuilder::new(dialect, BASE)
            .contains("dpd.dpd_nome_dependente", name.as_deref())
            .filter("dpd.dpd_num_cpf = ?", cpf.as_deref())
            .contains("dpd.dpd_filiacao_mae", mother.as_deref())
            .date_equals("dpd.dpd_data_nasc", cpf.as_deref())
            .starts_with_any("dpd.dpd_nome_dependente", initials)
            .any_of("dpd.dpd_cod_dependente", codes.iter().map(String::as_str))
            .order_by("dpd.dpd_nome_dependente")
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn placeholders_match_parameters(
            dialect in arb_dialect(),
            name in arb_filter(),
            cpf in arb_filter(),
            mother in arb_filter(),
            initials in arb_initials(),
            codes in prop::collection::vec("[0-9]{1,6}", 0..6),
        ) {
            let query = build(dialect, &name, &cpf, &mother, &initials, &codes);
            prop_assert_eq!(count_placeholders(&query.sql), query.params.len());

            let present = |f: &Option<String>| f.as_deref().map_or(false, |s| !s.trim().is_empty());
            if present(&name) {
                let expected = Value::Text(format!(
                    "%{}%",
                    name.as_deref().unwrap_or_default().trim().to_uppercase()
                ));
                prop_assert!(query.params.contains(&expected));
            }
        }

        #[test]
        fn blank_filters_leave_base_untouched(
            dialect in arb_dialect(),
            blanks in prop::collection::vec(prop_oneof![Just(None), Just(Some(" ".to_string()))], 3),
        ) {
            let query = QueryBuilder::new(dialect, BASE)
                .contains("dpd.dpd_nome_dependente", blanks[0].as_deref())
                .filter("dpd.dpd_num_cpf = ?", blanks[1].as_deref())
                .date_equals("dpd.dpd_data_nasc", blanks[2].as_deref())
                .starts_with_any("dpd.dpd_nome_dependente", &[" ", ""])
                .any_of("dpd.dpd_cod_dependente", Vec::<String>::new())
                .build()
                .unwrap();
            prop_assert_eq!(query.sql, BASE);
            prop_assert!(query.params.is_empty());
        }

        #[test]
        fn code_lists_bind_one_parameter_per_code(
            codes in prop::collection::vec("[0-9A-Z]{1,8}", 1..10),
            comma in any::<bool>(),
        ) {
            let joined = codes.join(if comma { "," } else { "-" });
            let parsed = parse_code_list(&joined);
            prop_assert_eq!(&parsed, &codes);

            let query = QueryBuilder::new(Dialect::Sqlite, "update alu_aluno_apto set ativo = 'N'")
                .any_of("cod_dependente", parsed)
                .build()
                .unwrap();
            prop_assert_eq!(query.params.len(), codes.len());
            prop_assert_eq!(count_placeholders(&query.sql), codes.len());
        }

        #[test]
        fn normalization_is_idempotent(input in "[A-Za-z0-9 'ÇÁÀÃÂÄÉÈÊËÍÌÎÏÓÒÕÖÔÚÙÛÜçã]{0,24}") {
            let once = normalize_str(&input);
            prop_assert_eq!(normalize_str(&once), once.clone());
            prop_assert!(!once.contains('\''));
            prop_assert!(!once.contains('Ç'));
            prop_assert_eq!(once.chars().count(), input.chars().filter(|c| *c != '\'').count());
        }

        #[test]
        fn eleven_digits_not_all_equal_pass_the_cpf_check(cpf in "[0-9]{11}") {
            let all_same = cpf.chars().all(|c| Some(c) == cpf.chars().next());
            prop_assert_eq!(verify_cpf(&cpf), !all_same);
        }
    }
}

use cfg_normalizer::useless::{productive_symbols, reachable_symbols};
use cfg_normalizer::{
    eliminate_null_productions, eliminate_unit_productions, eliminate_useless_symbols, normalize,
    transform_into_cnf, Grammar, GrammarError, Symbol,
};
use proptest::prelude::*;

const NONTERMINALS: [char; 4] = ['S', 'A', 'B', 'C'];

fn symbol() -> impl Strategy<Value = char> {
    prop::sample::select(vec!['S', 'A', 'B', 'C', 'a', 'b', 'c'])
}

fn alternative() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just("\\".to_string()),
        5 => prop::collection::vec(symbol(), 1..12).prop_map(|cs| cs.into_iter().collect()),
    ]
}

fn grammar() -> impl Strategy<Value = Grammar> {
    prop::collection::vec((prop::sample::select(NONTERMINALS.to_vec()), alternative()), 1..8)
        .prop_map(|rules| {
            let mut grammar = Grammar::new('S').unwrap();
            for (lhs, rhs) in rules {
                grammar.add_rule(lhs, &rhs).unwrap();
            }
            grammar
        })
}

proptest! {
    #[test]
    fn null_elimination_leaves_no_null_marker(g in grammar()) {
        let result = eliminate_null_productions(&g);
        for rule in result.rules() {
            prop_assert!(!rule.rhs.is_empty());
            prop_assert!(!rule.rhs.contains(&Symbol::Null));
        }
    }

    #[test]
    fn unit_elimination_leaves_no_units(g in grammar()) {
        let result = eliminate_unit_productions(&eliminate_null_productions(&g));
        prop_assert!(result.rules().iter().all(|rule| !rule.is_unit()));
    }

    #[test]
    fn useless_elimination_keeps_only_useful_symbols(g in grammar()) {
        let input = eliminate_unit_productions(&eliminate_null_productions(&g));
        let result = eliminate_useless_symbols(&input);
        let reachable = reachable_symbols(&input);
        let productive = productive_symbols(&result);
        for nt in result.nonterminals() {
            prop_assert!(reachable.contains(&nt), "{} unreachable in\n{}", nt, result);
            prop_assert!(productive.contains(&nt), "{} unproductive in\n{}", nt, result);
        }
    }

    #[test]
    fn pipeline_output_is_cnf(g in grammar()) {
        match normalize(&g) {
            Ok(cnf) => {
                prop_assert!(cnf.is_cnf(), "not in CNF:\n{}", cnf);
                prop_assert_eq!(cnf.start_symbol(), 'S');
            }
            Err(GrammarError::SymbolExhaustion(_)) => {}
            Err(err) => prop_assert!(false, "unexpected error: {}", err),
        }
    }

    #[test]
    fn cnf_transform_is_idempotent(g in grammar()) {
        if let Ok(cnf) = normalize(&g) {
            prop_assert_eq!(transform_into_cnf(&cnf).unwrap(), cnf);
        }
    }
}

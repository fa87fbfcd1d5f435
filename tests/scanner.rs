#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn rendered(source: &str) -> Vec<String> {
        let (tokens, errors) = scan_tokens(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class classy fun _under orchid or this super nil",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "_under"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::OR, "or"),
                (TokenType::THIS, "this"),
                (TokenType::SUPER, "super"),
                (TokenType::NIL, "nil"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_are_skipped() {
        assert_token_sequence(
            "// leading comment\nvar x; // trailing\n// no newline at end",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(
            rendered("123 45.67 1.0"),
            vec![
                "NUMBER 123 123.0",
                "NUMBER 45.67 45.67",
                "NUMBER 1.0 1.0",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        assert_token_sequence(
            "123.",
            &[
                (TokenType::NUMBER(0.0), "123"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_string_literal_keeps_contents_without_quotes() {
        let (tokens, errors) = scan_tokens("\"hello world\"");
        assert!(errors.is_empty());

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello world"),
            other => panic!("expected STRING, got {:?}", other),
        }
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
        assert_eq!(tokens[0].to_string(), "STRING \"hello world\" hello world");
    }

    #[test]
    fn test_multiline_string_advances_line_count() {
        let (tokens, errors) = scan_tokens("\"a\nb\"\nx");
        assert!(errors.is_empty());

        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let (tokens, errors) = scan_tokens("print \"oops");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unterminated string.");

        // Scanning continues to EOF.
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error '$', LEFT_PAREN, error '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );
    }

    #[test]
    fn test_non_ascii_character_is_skipped_whole() {
        let (tokens, errors) = scan_tokens("é;");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unexpected character: é");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, ";");
    }

    #[test]
    fn test_error_line_numbers() {
        let (_, errors) = scan_tokens("\n\n@");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), Some(3));
        assert!(errors[0].is_static());
    }

    #[test]
    fn test_empty_source_yields_only_eof() {
        assert_eq!(rendered(""), vec!["EOF  null"]);
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("x");

        assert!(scanner.next().is_some());
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_tokens_serialize_to_json() {
        let (tokens, _) = scan_tokens("x");
        let json: String = serde_json::to_string(&tokens[0]).unwrap();

        assert!(json.contains("\"IDENTIFIER\""), "{}", json);
        assert!(json.contains("\"lexeme\":\"x\""), "{}", json);
        assert!(json.contains("\"line\":1"), "{}", json);
    }

    fn assert_token_matches(result: &rox::error::Result<Token<'_>>, expected_type: TokenType, expected_lexeme: &str) {
        match result {
            Ok(token) => {
                assert_eq!(token.token_type, expected_type);
                assert_eq!(token.lexeme, expected_lexeme);
            }
            Err(e) => panic!("Expected token, got error: {}", e),
        }
    }
}

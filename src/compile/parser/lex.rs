use std::fmt::Display;

use chumsky::prelude::*;

use super::Spanned;

#[derive(Clone, Debug, PartialEq)]
#[allow(non_camel_case_types)]
pub enum Token<'src> {
    IDENT(&'src str),
    NUM(&'src str),
    CLASS,
    PUBLIC,
    STATIC,
    VOID,
    MAIN,
    STRING,
    EXTENDS,
    RETURN,
    INT,
    BOOLEAN,
    IF,
    ELSE,
    WHILE,
    TRUE,
    FALSE,
    THIS,
    NEW,
    LENGTH,
    PRINTLN,
    L_ROUND,
    R_ROUND,
    L_CURLY,
    R_CURLY,
    L_SQUARE,
    R_SQUARE,
    SEMICOLON,
    COMMA,
    DOT,
    EQ,
    AND,
    LESS,
    PLUS,
    MINUS,
    STAR,
    BANG,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::IDENT(ident) => ident,
            Self::NUM(value) => value,
            Self::CLASS => "class",
            Self::PUBLIC => "public",
            Self::STATIC => "static",
            Self::VOID => "void",
            Self::MAIN => "main",
            Self::STRING => "String",
            Self::EXTENDS => "extends",
            Self::RETURN => "return",
            Self::INT => "int",
            Self::BOOLEAN => "boolean",
            Self::IF => "if",
            Self::ELSE => "else",
            Self::WHILE => "while",
            Self::TRUE => "true",
            Self::FALSE => "false",
            Self::THIS => "this",
            Self::NEW => "new",
            Self::LENGTH => "length",
            Self::PRINTLN => "System.out.println",
            Self::L_ROUND => "(",
            Self::R_ROUND => ")",
            Self::L_CURLY => "{",
            Self::R_CURLY => "}",
            Self::L_SQUARE => "[",
            Self::R_SQUARE => "]",
            Self::SEMICOLON => ";",
            Self::COMMA => ",",
            Self::DOT => ".",
            Self::EQ => "=",
            Self::AND => "&&",
            Self::LESS => "<",
            Self::PLUS => "+",
            Self::MINUS => "-",
            Self::STAR => "*",
            Self::BANG => "!",
        };

        write!(f, "{text}")
    }
}

type ErrorParserExtra<'src> = extra::Err<Rich<'src, char, SimpleSpan>>;

fn decimal<'src>() -> impl Parser<'src, &'src str, Token<'src>, ErrorParserExtra<'src>> {
    text::int(10).map(Token::NUM)
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, ErrorParserExtra<'src>> {
    let ident = text::ascii::ident().map(|ident| match ident {
        "class" => Token::CLASS,
        "public" => Token::PUBLIC,
        "static" => Token::STATIC,
        "void" => Token::VOID,
        "main" => Token::MAIN,
        "String" => Token::STRING,
        "extends" => Token::EXTENDS,
        "return" => Token::RETURN,
        "int" => Token::INT,
        "boolean" => Token::BOOLEAN,
        "if" => Token::IF,
        "else" => Token::ELSE,
        "while" => Token::WHILE,
        "true" => Token::TRUE,
        "false" => Token::FALSE,
        "this" => Token::THIS,
        "new" => Token::NEW,
        "length" => Token::LENGTH,
        _ => Token::IDENT(ident),
    });

    let println = just("System.out.println").to(Token::PRINTLN);

    let punctuation = choice((
        just("(").to(Token::L_ROUND),
        just(")").to(Token::R_ROUND),
        just("{").to(Token::L_CURLY),
        just("}").to(Token::R_CURLY),
        just("[").to(Token::L_SQUARE),
        just("]").to(Token::R_SQUARE),
        just(";").to(Token::SEMICOLON),
        just(",").to(Token::COMMA),
        just(".").to(Token::DOT),
        just("=").to(Token::EQ),
        just("&&").to(Token::AND),
        just("<").to(Token::LESS),
        just("+").to(Token::PLUS),
        just("-").to(Token::MINUS),
        just("*").to(Token::STAR),
        just("!").to(Token::BANG),
    ));

    let comment_single_line = just("//")
        .then(any().and_is(text::newline().not()).repeated())
        .padded()
        .to(())
        .boxed();

    let comment_multi_line = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .padded()
        .to(())
        .boxed();

    let comment = choice((comment_single_line, comment_multi_line)).boxed();

    choice((decimal(), println, ident, punctuation))
        .map_with(|token, ctx| (token, ctx.span().into()))
        .padded_by(comment.repeated())
        .padded()
        .repeated()
        .collect()
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token<'_>> {
        lexer()
            .parse(src)
            .into_result()
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            tokens("class Foo extends Bar"),
            vec![
                Token::CLASS,
                Token::IDENT("Foo"),
                Token::EXTENDS,
                Token::IDENT("Bar")
            ]
        );
    }

    #[test]
    fn println_is_one_token() {
        assert_eq!(
            tokens("System.out.println(x.length);"),
            vec![
                Token::PRINTLN,
                Token::L_ROUND,
                Token::IDENT("x"),
                Token::DOT,
                Token::LENGTH,
                Token::R_ROUND,
                Token::SEMICOLON
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            tokens("a // trailing\n /* block\n comment */ && !b"),
            vec![
                Token::IDENT("a"),
                Token::AND,
                Token::BANG,
                Token::IDENT("b")
            ]
        );
    }

    #[test]
    fn spans_are_byte_ranges() {
        let spanned = lexer().parse("x = 42;").into_result().unwrap();
        assert_eq!(spanned[2], (Token::NUM("42"), 4..6));
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(lexer().parse("x = 4 # 2;").into_result().is_err());
    }
}

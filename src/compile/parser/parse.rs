use chumsky::input::ValueInput;
use chumsky::prelude::*;

use crate::compile::ast::int_literal::IntLiteral;
use crate::compile::ast::{
    BinaryOp, ClassDecl, Expr, MainClass, MethodDecl, Program, SourcePos, Stmt, Type, VarDecl,
};
use crate::compile::parser::lex::Token;

type ErrorParserExtra<'src> = extra::Err<Rich<'src, Token<'src>, SourcePos>>;

// What may follow the leading clause of an expression.
#[derive(Clone)]
enum Suffix {
    And(Expr),
    Binary(BinaryOp, Expr),
    Lookup(Expr),
    Length,
    Call(String, Vec<Expr>),
}

fn ident<'src, I>() -> impl Parser<'src, I, String, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    select! {Token::IDENT(ident) => ident.to_string()}
}

pub fn expr_parser<'src, I>() -> impl Parser<'src, I, Expr, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let num = select! {Token::NUM(value) => value};

    recursive(|expr| {
        let args = expr
            .clone()
            .separated_by(just(Token::COMMA))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND));

        let size = expr
            .clone()
            .delimited_by(just(Token::L_SQUARE), just(Token::R_SQUARE));

        let primary = choice((
            num.map_with(|value: &str, ctx| {
                Expr::Int(IntLiteral::new(value.to_string(), 10), ctx.span())
            }),
            just(Token::TRUE).map_with(|_, ctx| Expr::True(ctx.span())),
            just(Token::FALSE).map_with(|_, ctx| Expr::False(ctx.span())),
            just(Token::THIS).map_with(|_, ctx| Expr::This(ctx.span())),
            just(Token::NEW)
                .ignore_then(just(Token::INT))
                .ignore_then(size.clone())
                .map_with(|size: Expr, ctx| Expr::NewIntArray(size.boxed(), ctx.span())),
            just(Token::NEW)
                .ignore_then(just(Token::BOOLEAN))
                .ignore_then(size)
                .map_with(|size: Expr, ctx| Expr::NewBoolArray(size.boxed(), ctx.span())),
            just(Token::NEW)
                .ignore_then(ident())
                .then_ignore(just(Token::L_ROUND))
                .then_ignore(just(Token::R_ROUND))
                .map_with(|name, ctx| Expr::NewObject(name, ctx.span())),
            ident().map_with(|name, ctx| Expr::Ident(name, ctx.span())),
            expr.clone()
                .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND))
                .map_with(|inner: Expr, ctx| Expr::Paren(inner.boxed(), ctx.span())),
        ))
        .boxed();

        let clause = recursive(|clause| {
            just(Token::BANG)
                .ignore_then(clause)
                .map_with(|inner: Expr, ctx| Expr::Not(inner.boxed(), ctx.span()))
                .or(primary.clone())
        });

        let binary_op = choice((
            just(Token::LESS).to(BinaryOp::Less),
            just(Token::PLUS).to(BinaryOp::Plus),
            just(Token::MINUS).to(BinaryOp::Minus),
            just(Token::STAR).to(BinaryOp::Times),
        ));

        let suffix = choice((
            just(Token::AND).ignore_then(clause.clone()).map(Suffix::And),
            binary_op
                .then(primary.clone())
                .map(|(op, rhs)| Suffix::Binary(op, rhs)),
            primary
                .clone()
                .delimited_by(just(Token::L_SQUARE), just(Token::R_SQUARE))
                .map(Suffix::Lookup),
            just(Token::DOT)
                .ignore_then(just(Token::LENGTH))
                .to(Suffix::Length),
            just(Token::DOT)
                .ignore_then(ident())
                .then(args)
                .map(|(name, args)| Suffix::Call(name, args)),
        ));

        clause
            .then(suffix.or_not())
            .try_map(|(lhs, suffix): (Expr, Option<Suffix>), span: SourcePos| {
                let Some(suffix) = suffix else {
                    return Ok(lhs);
                };

                if let (Expr::Not(_, _), Suffix::Binary(..) | Suffix::Lookup(_) | Suffix::Length | Suffix::Call(..)) =
                    (&lhs, &suffix)
                {
                    return Err(Rich::custom(
                        span,
                        "only `&&` may follow a negated operand; wrap it in parentheses",
                    ));
                }

                Ok(match suffix {
                    Suffix::And(rhs) => Expr::Binary(BinaryOp::And, lhs.boxed(), rhs.boxed()),
                    Suffix::Binary(op, rhs) => Expr::Binary(op, lhs.boxed(), rhs.boxed()),
                    Suffix::Lookup(index) => Expr::ArrayLookup(lhs.boxed(), index.boxed()),
                    Suffix::Length => Expr::ArrayLength(lhs.boxed(), span),
                    Suffix::Call(name, args) => Expr::MethodCall(lhs.boxed(), name, args, span),
                })
            })
    })
}

fn type_parser<'src, I>() -> impl Parser<'src, I, Type, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let brackets = just(Token::L_SQUARE).then(just(Token::R_SQUARE));

    choice((
        just(Token::INT).then(brackets.clone()).to(Type::IntArray),
        just(Token::BOOLEAN).then(brackets).to(Type::BoolArray),
        just(Token::BOOLEAN).to(Type::Boolean),
        just(Token::INT).to(Type::Int),
        ident().map(Type::Class),
    ))
}

fn var_decl_parser<'src, I>() -> impl Parser<'src, I, VarDecl, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    type_parser()
        .then(ident())
        .then_ignore(just(Token::SEMICOLON))
        .map_with(|(ty, name), ctx| VarDecl {
            ty,
            name,
            span: ctx.span(),
        })
}

pub fn stmt_parser<'src, I>() -> impl Parser<'src, I, Stmt, ErrorParserExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let expr = expr_parser().boxed();

    recursive(|stmt| {
        let condition = expr
            .clone()
            .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND));

        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::L_CURLY), just(Token::R_CURLY))
            .map(Stmt::Block);

        let assign = ident()
            .then_ignore(just(Token::EQ))
            .then(expr.clone())
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|(name, value), ctx| Stmt::Assign(name, value, ctx.span()));

        let array_assign = ident()
            .then(
                expr.clone()
                    .delimited_by(just(Token::L_SQUARE), just(Token::R_SQUARE)),
            )
            .then_ignore(just(Token::EQ))
            .then(expr.clone())
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|((name, index), value), ctx| {
                Stmt::ArrayAssign(name, index, value, ctx.span())
            });

        let if_else = just(Token::IF)
            .ignore_then(condition.clone())
            .then(stmt.clone())
            .then_ignore(just(Token::ELSE))
            .then(stmt.clone())
            .map(|((cond, then), otherwise): ((Expr, Stmt), Stmt)| {
                Stmt::If(cond, then.boxed(), otherwise.boxed())
            });

        let while_loop = just(Token::WHILE)
            .ignore_then(condition.clone())
            .then(stmt.clone())
            .map(|(cond, body): (Expr, Stmt)| Stmt::While(cond, body.boxed()));

        let print = just(Token::PRINTLN)
            .ignore_then(condition)
            .then_ignore(just(Token::SEMICOLON))
            .map_with(|value, ctx| Stmt::Print(value, ctx.span()));

        choice((block, assign, array_assign, if_else, while_loop, print))
    })
}

pub fn method_parser<'src, I>() -> impl Parser<'src, I, MethodDecl, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let param = type_parser()
        .then(ident())
        .map_with(|(ty, name), ctx| VarDecl {
            ty,
            name,
            span: ctx.span(),
        });

    let params = param
        .separated_by(just(Token::COMMA))
        .collect::<Vec<_>>()
        .delimited_by(just(Token::L_ROUND), just(Token::R_ROUND));

    just(Token::PUBLIC)
        .ignore_then(type_parser())
        .then(ident())
        .then(params)
        .then_ignore(just(Token::L_CURLY))
        .then(var_decl_parser().repeated().collect::<Vec<_>>())
        .then(stmt_parser().repeated().collect::<Vec<_>>())
        .then_ignore(just(Token::RETURN))
        .then(expr_parser())
        .then_ignore(just(Token::SEMICOLON))
        .then_ignore(just(Token::R_CURLY))
        .map_with(
            |(((((ty, name), params), locals), body), ret), ctx| MethodDecl {
                ty,
                name,
                params,
                locals,
                body,
                ret,
                span: ctx.span(),
            },
        )
}

pub fn class_parser<'src, I>() -> impl Parser<'src, I, ClassDecl, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    just(Token::CLASS)
        .ignore_then(ident())
        .then(just(Token::EXTENDS).ignore_then(ident()).or_not())
        .then_ignore(just(Token::L_CURLY))
        .then(var_decl_parser().repeated().collect::<Vec<_>>())
        .then(method_parser().repeated().collect::<Vec<_>>())
        .then_ignore(just(Token::R_CURLY))
        .map_with(|(((name, parent), fields), methods), ctx| ClassDecl {
            name,
            parent,
            fields,
            methods,
            span: ctx.span(),
        })
}

pub fn main_class_parser<'src, I>() -> impl Parser<'src, I, MainClass, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    let signature = just(Token::PUBLIC)
        .then(just(Token::STATIC))
        .then(just(Token::VOID))
        .then(just(Token::MAIN))
        .then(just(Token::L_ROUND))
        .then(just(Token::STRING))
        .then(just(Token::L_SQUARE))
        .then(just(Token::R_SQUARE))
        .ignore_then(ident())
        .then_ignore(just(Token::R_ROUND));

    just(Token::CLASS)
        .ignore_then(ident())
        .then_ignore(just(Token::L_CURLY))
        .then(signature)
        .then_ignore(just(Token::L_CURLY))
        .then(var_decl_parser().repeated().collect::<Vec<_>>())
        .then(stmt_parser().repeated().collect::<Vec<_>>())
        .then_ignore(just(Token::R_CURLY))
        .then_ignore(just(Token::R_CURLY))
        .map_with(|(((name, args_name), locals), body), ctx| MainClass {
            name,
            args_name,
            locals,
            body,
            span: ctx.span(),
        })
}

pub fn program_parser<'src, I>() -> impl Parser<'src, I, Program, ErrorParserExtra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = SourcePos>,
{
    main_class_parser()
        .then(class_parser().repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(main, classes)| Program { main, classes })
}

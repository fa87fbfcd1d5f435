use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

/// Renders AST nodes as parenthesised prefix expressions, e.g.
/// `(+ 1.0 (group (* 2.0 3.0)))`.  Debug aid for the `parse` subcommand.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&self, expr: &Expr<'_>) -> String {
        match expr {
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => s.to_string(),

                LiteralValue::True => "true".to_string(),

                LiteralValue::False => "false".to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Grouping(expr) => format!("(group {})", self.print(expr)),

            Expr::Variable { name, .. } => name.lexeme.to_string(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out: String = format!("(call {}", self.print(callee));
                for argument in arguments {
                    out.push(' ');
                    out.push_str(&self.print(argument));
                }
                out.push(')');
                out
            }

            Expr::Get { object, name } => format!("(. {} {})", self.print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt<'_>) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, self.print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                let inner: Vec<String> = statements.iter().map(|s| self.print_stmt(s)).collect();
                format!("(block {})", inner.join(" "))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", self.print(condition), self.print_stmt(body))
            }

            Stmt::Function(decl) => self.print_function("fun", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print(value)),
                None => "(return)".to_string(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out: String = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    out.push_str(&format!(" < {}", self.print(superclass)));
                }
                for method in methods {
                    out.push(' ');
                    out.push_str(&self.print_function("method", method));
                }
                out.push(')');
                out
            }
        }
    }

    fn print_function(&self, tag: &str, decl: &FunctionDecl<'_>) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme).collect();
        let body: Vec<String> = decl.body.iter().map(|s| self.print_stmt(s)).collect();

        format!(
            "({} {} ({}) {})",
            tag,
            decl.name.lexeme,
            params.join(" "),
            body.join(" ")
        )
    }
}

//! SQL dialect: identifier quoting and placeholder rendering.
//!
//! Every compiler in this crate emits `?` placeholders. [`Dialect::finish`] renders
//! them into the dialect's final form once, at the end of statement assembly.

/// Placeholder style of the final SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?` (MySQL, SQLite).
    Question,
    /// `$1, $2, ...` (PostgreSQL).
    Numbered,
}

/// Identifier quote character plus placeholder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub quote: char,
    pub placeholder: Placeholder,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::MYSQL
    }
}

impl Dialect {
    pub const MYSQL: Dialect = Dialect {
        quote: '`',
        placeholder: Placeholder::Question,
    };

    pub const POSTGRES: Dialect = Dialect {
        quote: '"',
        placeholder: Placeholder::Numbered,
    };

    pub const SQLITE: Dialect = Dialect {
        quote: '"',
        placeholder: Placeholder::Question,
    };

    /// Quote a condition/SET field name.
    ///
    /// A qualified name (`table.column`) is emitted as-is; anything else is wrapped
    /// in the quote character.
    pub fn quote_field(&self, field: &str) -> String {
        if field.contains('.') {
            field.to_string()
        } else {
            self.wrap(field)
        }
    }

    /// Quote a table name or projected column when it is a plain identifier.
    ///
    /// Expressions, `*`, aliases and qualified names pass through untouched.
    pub fn quote_ident_if_plain(&self, name: &str) -> String {
        let plain = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit());
        if plain {
            self.wrap(name)
        } else {
            name.to_string()
        }
    }

    fn wrap(&self, name: &str) -> String {
        let q = self.quote;
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Render the `?` placeholders of assembled SQL in this dialect's style.
    ///
    /// Question marks inside string literals or quoted identifiers are kept.
    pub fn finish(&self, sql: &str) -> String {
        match self.placeholder {
            Placeholder::Question => sql.to_string(),
            Placeholder::Numbered => rewrite_placeholders(sql, |n| format!("${n}")),
        }
    }

    /// Count the placeholders outside literals and quoted identifiers.
    pub fn count_placeholders(sql: &str) -> usize {
        let mut count = 0;
        rewrite_placeholders(sql, |n| {
            count = n;
            String::new()
        });
        count
    }
}

fn rewrite_placeholders(sql: &str, mut render: impl FnMut(usize) -> String) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quoted: Option<char> = None;
    let mut idx = 0usize;
    for ch in sql.chars() {
        match quoted {
            Some(q) => {
                if ch == q {
                    quoted = None;
                }
                out.push(ch);
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quoted = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    idx += 1;
                    out.push_str(&render(idx));
                }
                _ => out.push(ch),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_fields_are_never_quoted() {
        let d = Dialect::MYSQL;
        assert_eq!(d.quote_field("name"), "`name`");
        assert_eq!(d.quote_field("u.name"), "u.name");
        assert_eq!(Dialect::POSTGRES.quote_field("age"), "\"age\"");
    }

    #[test]
    fn plain_identifiers_are_quoted() {
        let d = Dialect::MYSQL;
        assert_eq!(d.quote_ident_if_plain("users"), "`users`");
        assert_eq!(d.quote_ident_if_plain("*"), "*");
        assert_eq!(d.quote_ident_if_plain("users u"), "users u");
        assert_eq!(d.quote_ident_if_plain("COUNT(*)"), "COUNT(*)");
        assert_eq!(d.quote_ident_if_plain("u.id"), "u.id");
    }

    #[test]
    fn numbered_placeholders_skip_literals() {
        let sql = "SELECT * FROM t WHERE a=? AND b='?' AND \"c?\"=? AND d IN (?,?)";
        assert_eq!(
            Dialect::POSTGRES.finish(sql),
            "SELECT * FROM t WHERE a=$1 AND b='?' AND \"c?\"=$2 AND d IN ($3,$4)"
        );
        assert_eq!(Dialect::MYSQL.finish(sql), sql);
        assert_eq!(Dialect::count_placeholders(sql), 4);
    }
}

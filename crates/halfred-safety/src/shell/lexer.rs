//! Quote-aware tokenizer for shell command lines.
//!
//! This is not a shell. It understands exactly as much POSIX syntax as the
//! classifier needs: quoting and escapes, command separators, pipes,
//! redirections, here-documents and command substitution. Substitution
//! and here-document bodies are kept verbatim so they can be classified on
//! their own.

use std::iter::Peekable;
use std::mem;
use std::str::Chars;

/// Why a line could not be tokenized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum LexError {
    #[error("unbalanced {0} quote")]
    UnbalancedQuote(char),
    #[error("trailing escape")]
    TrailingEscape,
    #[error("unterminated command substitution")]
    UnterminatedSubstitution,
    #[error("unterminated here-document")]
    UnterminatedHereDoc,
    #[error("dangling `{0}` operator")]
    DanglingOperator(&'static str),
    #[error("redirection without a target")]
    MissingRedirectTarget,
}

/// A shell word after quote removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Word {
    pub(crate) text: String,
    /// Any part of the word was quoted or escaped.
    pub(crate) quoted: bool,
    /// Bodies of `$(...)`, backtick and process substitutions in the word.
    pub(crate) substitutions: Vec<String>,
    /// Body of the here-document this word delimits.
    pub(crate) heredoc: Option<String>,
}

/// Operators that separate commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Seq,
    And,
    Or,
    Pipe,
    Background,
    /// `(` or `)`; splits commands without joining them.
    Group,
}

impl Control {
    /// Operators that need a command on both sides.
    pub(crate) fn joins(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Pipe)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Seq => ";",
            Self::And => "&&",
            Self::Or => "||",
            Self::Pipe => "|",
            Self::Background => "&",
            Self::Group => "(",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RedirectOp {
    /// `>`, `>|`, `&>`, `N>`
    Write,
    /// `>>`, `&>>`
    Append,
    /// `<`
    Read,
    /// `<<`, `<<-`
    HereDoc,
    /// `<<<`
    HereString,
    /// `>&`, `<&`
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Word(Word),
    Control(Control),
    Redirect(RedirectOp),
}

#[derive(Default)]
struct WordBuf {
    text: String,
    started: bool,
    quoted: bool,
    substitutions: Vec<String>,
}

impl WordBuf {
    fn push(&mut self, c: char) {
        self.started = true;
        self.text.push(c);
    }

    fn push_substitution(&mut self, open: &str, body: String, close: &str) {
        self.started = true;
        self.text.push_str(open);
        self.text.push_str(&body);
        self.text.push_str(close);
        self.substitutions.push(body);
    }

    fn mark_quoted(&mut self) {
        self.started = true;
        self.quoted = true;
    }

    /// A bare run of digits directly before `>` or `<` is a file descriptor.
    fn is_fd_number(&self) -> bool {
        self.started
            && !self.quoted
            && self.substitutions.is_empty()
            && !self.text.is_empty()
            && self.text.bytes().all(|b| b.is_ascii_digit())
    }

    fn take(&mut self) -> Option<Word> {
        if !self.started {
            return None;
        }
        let word = Word {
            text: mem::take(&mut self.text),
            quoted: self.quoted,
            substitutions: mem::take(&mut self.substitutions),
            heredoc: None,
        };
        self.started = false;
        self.quoted = false;
        Some(word)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    tokens: Vec<Token>,
    word: WordBuf,
    /// Index of the first token on the current physical line.
    line_start: usize,
}

/// Split a command line into tokens.
pub(crate) fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    let mut lx = Lexer {
        chars: line.chars().peekable(),
        tokens: Vec::new(),
        word: WordBuf::default(),
        line_start: 0,
    };

    while let Some(c) = lx.chars.next() {
        match c {
            ' ' | '\t' | '\r' => lx.finish_word(),
            '\n' => {
                lx.finish_word();
                lx.read_heredoc_bodies()?;
                lx.push_control(Control::Seq);
                lx.line_start = lx.tokens.len();
            },
            '#' if !lx.word.started => lx.skip_comment(),
            '\'' => lx.single_quoted()?,
            '"' => lx.double_quoted()?,
            '\\' => match lx.chars.next() {
                None => return Err(LexError::TrailingEscape),
                Some('\n') => {},
                Some(escaped) => {
                    lx.word.mark_quoted();
                    lx.word.push(escaped);
                },
            },
            '$' if lx.eat('(') => {
                let body = lx.capture_parens()?;
                lx.word.push_substitution("$(", body, ")");
            },
            '`' => {
                let body = lx.capture_backticks()?;
                lx.word.push_substitution("`", body, "`");
            },
            '|' => {
                lx.finish_word();
                let ctl = if lx.eat('|') {
                    Control::Or
                } else {
                    lx.eat('&');
                    Control::Pipe
                };
                lx.push_control(ctl);
            },
            '&' => {
                lx.finish_word();
                if lx.eat('&') {
                    lx.push_control(Control::And);
                } else if lx.eat('>') {
                    let op = if lx.eat('>') {
                        RedirectOp::Append
                    } else {
                        RedirectOp::Write
                    };
                    lx.tokens.push(Token::Redirect(op));
                } else {
                    lx.push_control(Control::Background);
                }
            },
            ';' => {
                lx.finish_word();
                lx.eat(';');
                lx.eat('&');
                lx.push_control(Control::Seq);
            },
            '>' => {
                if lx.eat('(') {
                    lx.finish_word();
                    let body = lx.capture_parens()?;
                    lx.word.push_substitution(">(", body, ")");
                    continue;
                }
                lx.finish_redirect_source();
                let op = if lx.eat('>') {
                    RedirectOp::Append
                } else if lx.eat('&') {
                    RedirectOp::Duplicate
                } else {
                    lx.eat('|');
                    RedirectOp::Write
                };
                lx.tokens.push(Token::Redirect(op));
            },
            '<' => {
                if lx.eat('(') {
                    lx.finish_word();
                    let body = lx.capture_parens()?;
                    lx.word.push_substitution("<(", body, ")");
                    continue;
                }
                lx.finish_redirect_source();
                let op = if lx.eat('<') {
                    if lx.eat('<') {
                        RedirectOp::HereString
                    } else {
                        lx.eat('-');
                        RedirectOp::HereDoc
                    }
                } else if lx.eat('&') {
                    RedirectOp::Duplicate
                } else {
                    RedirectOp::Read
                };
                lx.tokens.push(Token::Redirect(op));
            },
            '(' | ')' => {
                lx.finish_word();
                lx.push_control(Control::Group);
            },
            _ => lx.word.push(c),
        }
    }

    lx.finish_word();
    Ok(lx.tokens)
}

impl Lexer<'_> {
    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn finish_word(&mut self) {
        if let Some(word) = self.word.take() {
            self.tokens.push(Token::Word(word));
        }
    }

    /// Drop a file-descriptor prefix like the `2` in `2>`; otherwise end the word.
    fn finish_redirect_source(&mut self) {
        if self.word.is_fd_number() {
            self.word.clear();
        } else {
            self.finish_word();
        }
    }

    fn push_control(&mut self, ctl: Control) {
        self.tokens.push(Token::Control(ctl));
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn single_quoted(&mut self) -> Result<(), LexError> {
        self.word.mark_quoted();
        loop {
            match self.chars.next() {
                None => return Err(LexError::UnbalancedQuote('\'')),
                Some('\'') => return Ok(()),
                Some(c) => self.word.push(c),
            }
        }
    }

    fn double_quoted(&mut self) -> Result<(), LexError> {
        self.word.mark_quoted();
        loop {
            match self.chars.next() {
                None => return Err(LexError::UnbalancedQuote('"')),
                Some('"') => return Ok(()),
                Some('\\') => match self.chars.next() {
                    None => return Err(LexError::UnbalancedQuote('"')),
                    Some('\n') => {},
                    Some(c @ ('"' | '\\' | '$' | '`')) => self.word.push(c),
                    Some(c) => {
                        self.word.push('\\');
                        self.word.push(c);
                    },
                },
                Some('$') if self.eat('(') => {
                    let body = self.capture_parens()?;
                    self.word.push_substitution("$(", body, ")");
                },
                Some('`') => {
                    let body = self.capture_backticks()?;
                    self.word.push_substitution("`", body, "`");
                },
                Some(c) => self.word.push(c),
            }
        }
    }

    /// Read up to the `)` matching an already consumed `(`.
    fn capture_parens(&mut self) -> Result<String, LexError> {
        let mut body = String::new();
        let mut depth = 1usize;
        let mut quote: Option<char> = None;

        while let Some(c) = self.chars.next() {
            if c == '\\' && quote != Some('\'') {
                body.push(c);
                if let Some(escaped) = self.chars.next() {
                    body.push(escaped);
                }
                continue;
            }
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {},
                None => match c {
                    '\'' | '"' => quote = Some(c),
                    '(' => depth = depth.saturating_add(1),
                    ')' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return Ok(body);
                        }
                    },
                    _ => {},
                },
            }
            body.push(c);
        }
        Err(LexError::UnterminatedSubstitution)
    }

    fn capture_backticks(&mut self) -> Result<String, LexError> {
        let mut body = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '`' => return Ok(body),
                '\\' => match self.chars.next() {
                    Some('`') => body.push('`'),
                    Some(other) => {
                        body.push('\\');
                        body.push(other);
                    },
                    None => break,
                },
                _ => body.push(c),
            }
        }
        Err(LexError::UnterminatedSubstitution)
    }

    /// Consume the bodies of here-documents opened on the line just ended
    /// and attach each to its delimiter word.
    fn read_heredoc_bodies(&mut self) -> Result<(), LexError> {
        let start = self.line_start;
        let delimiters: Vec<usize> = self
            .tokens
            .get(start..)
            .unwrap_or_default()
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| {
                matches!(pair, [Token::Redirect(RedirectOp::HereDoc), Token::Word(_)])
                    .then(|| start.saturating_add(i).saturating_add(1))
            })
            .collect();

        for idx in delimiters {
            let Some(Token::Word(word)) = self.tokens.get(idx) else {
                continue;
            };
            let delimiter = word.text.clone();
            let mut body = String::new();
            loop {
                let Some(line) = self.read_line() else {
                    return Err(LexError::UnterminatedHereDoc);
                };
                if line.trim_start_matches('\t') == delimiter {
                    break;
                }
                body.push_str(&line);
                body.push('\n');
            }
            if let Some(Token::Word(word)) = self.tokens.get_mut(idx) {
                word.heredoc = Some(body);
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> Option<String> {
        self.chars.peek()?;
        let mut line = String::new();
        for c in self.chars.by_ref() {
            if c == '\n' {
                break;
            }
            line.push(c);
        }
        Some(line)
    }
}

/// A redirection attached to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Redirect {
    pub(crate) op: RedirectOp,
    pub(crate) target: Word,
}

/// One simple command between separators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Segment {
    pub(crate) words: Vec<Word>,
    pub(crate) redirects: Vec<Redirect>,
    /// The operator that joined this segment to the previous one.
    pub(crate) joined_by: Option<Control>,
}

impl Segment {
    fn is_empty(&self) -> bool {
        self.words.is_empty() && self.redirects.is_empty()
    }

    /// Whether stdin of this segment is the previous segment's output.
    pub(crate) fn is_piped(&self) -> bool {
        self.joined_by == Some(Control::Pipe)
    }
}

/// Group tokens into simple commands.
pub(crate) fn split_segments(tokens: Vec<Token>) -> Result<Vec<Segment>, LexError> {
    let mut segments = Vec::new();
    let mut current = Segment::default();
    let mut joined_by: Option<Control> = None;
    let mut awaiting: Option<Control> = None;
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        match token {
            Token::Word(word) => {
                current.words.push(word);
                awaiting = None;
            },
            Token::Redirect(op) => {
                let Some(Token::Word(target)) = iter.next() else {
                    return Err(LexError::MissingRedirectTarget);
                };
                current.redirects.push(Redirect { op, target });
                awaiting = None;
            },
            Token::Control(ctl) => {
                if !current.is_empty() {
                    current.joined_by = joined_by;
                    segments.push(mem::take(&mut current));
                } else if ctl.joins() && segments.is_empty() {
                    return Err(LexError::DanglingOperator(ctl.as_str()));
                }
                if ctl != Control::Group {
                    joined_by = Some(ctl);
                    awaiting = ctl.joins().then_some(ctl);
                }
            },
        }
    }

    if !current.is_empty() {
        current.joined_by = joined_by;
        segments.push(current);
    } else if let Some(ctl) = awaiting {
        return Err(LexError::DanglingOperator(ctl.as_str()));
    }
    Ok(segments)
}

use crate::data::{class, COMMENT, PUNCTUATION, QUOTE, WHITESPACE};
use crate::errors::{Error, LexErrorKind};
use crate::Scalar;
use tracing::trace;

/// Inputs shorter than this use exact capacity bounds
const SMALL_INPUT: usize = 300;

/// The kind of a token in a [`TokenTape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    /// A scalar without surrounding quotes
    UnquotedScalar = 1,

    /// A scalar whose span starts and ends with a quote
    QuotedScalar = 2,

    /// `{`
    OpenGroup = 3,

    /// `}`
    CloseGroup = 4,

    /// `=`
    Equals = 5,
}

impl TokenKind {
    /// Returns true for either scalar kind
    #[inline]
    pub fn is_scalar(self) -> bool {
        matches!(self, TokenKind::UnquotedScalar | TokenKind::QuotedScalar)
    }
}

/// The output of a single tokenizer pass.
///
/// Tokens, scalar spans and group sizes are stored in dense, index-parallel
/// arrays. The n-th scalar token corresponds to the n-th scalar span and the
/// n-th open group token (the implicit root group is the zeroth) corresponds
/// to the n-th group size. Scalars reference the input and are never copied.
///
/// ```
/// use clausewitz_save::text::{Tokenizer, TokenKind};
/// let tape = Tokenizer::new(b"a=b").tokenize()?;
/// assert_eq!(
///     tape.tokens(),
///     &[
///         TokenKind::OpenGroup,
///         TokenKind::UnquotedScalar,
///         TokenKind::Equals,
///         TokenKind::UnquotedScalar,
///         TokenKind::CloseGroup,
///     ]
/// );
/// assert_eq!(tape.scalar(0).as_bytes(), b"a");
/// assert_eq!(tape.group_sizes(), &[1]);
/// # Ok::<(), clausewitz_save::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TokenTape<'a> {
    data: &'a [u8],
    tokens: Vec<TokenKind>,
    scalar_offsets: Vec<usize>,
    scalar_lengths: Vec<u32>,
    group_sizes: Vec<i32>,
}

impl<'a> TokenTape<'a> {
    /// The tokens, starting with the implicit root open group and ending with
    /// its close group
    pub fn tokens(&self) -> &[TokenKind] {
        &self.tokens
    }

    /// The input the tape references
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the n-th scalar as a zero-copy view into the input. Quoted
    /// scalars include their quotes.
    ///
    /// Panics if `index` is out of bounds
    pub fn scalar(&self, index: usize) -> Scalar<'a> {
        let (offset, len) = self.scalar_span(index);
        Scalar::new(&self.data[offset..offset + len as usize])
    }

    /// Returns the byte offset and length of the n-th scalar
    ///
    /// Panics if `index` is out of bounds
    pub fn scalar_span(&self, index: usize) -> (usize, u32) {
        (self.scalar_offsets[index], self.scalar_lengths[index])
    }

    /// The number of scalars
    pub fn scalar_count(&self) -> usize {
        self.scalar_offsets.len()
    }

    /// The running entry count of each group, a pre-sizing hint for the
    /// group's children. Keyed entries count once.
    pub fn group_sizes(&self) -> &[i32] {
        &self.group_sizes
    }

    /// The number of groups including the implicit root
    pub fn group_count(&self) -> usize {
        self.group_sizes.len()
    }
}

/// Splits a byte buffer into a [`TokenTape`] in one linear pass.
///
/// Storage is reserved up front from an upper bound derived from the input
/// length and never grows: exceeding the bound is an error, not a
/// reallocation.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    data: &'a [u8],
    token_capacity: usize,
    node_capacity: usize,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer over the data with capacity bounds derived from
    /// its length
    pub fn new(data: &'a [u8]) -> Self {
        let (token_capacity, node_capacity) = if data.len() < SMALL_INPUT {
            // the two implicit root tokens plus the all punctuation worst case
            (data.len() + 2, data.len() + 1)
        } else {
            (data.len() / 2, data.len() / 5)
        };

        trace!(
            len = data.len(),
            token_capacity,
            node_capacity,
            "tokenizer capacity"
        );

        Tokenizer {
            data,
            token_capacity,
            node_capacity,
        }
    }

    /// Runs the tokenizer
    pub fn tokenize(self) -> Result<TokenTape<'a>, Error> {
        let mut state = TokenizerState {
            tape: TokenTape {
                data: self.data,
                tokens: Vec::with_capacity(self.token_capacity),
                scalar_offsets: Vec::with_capacity(self.node_capacity),
                scalar_lengths: Vec::with_capacity(self.node_capacity),
                group_sizes: Vec::with_capacity(self.node_capacity),
            },
            stack: vec![0],
            token_capacity: self.token_capacity,
            node_capacity: self.node_capacity,
        };

        state.push_token(TokenKind::OpenGroup, 0)?;
        state.push_group(0)?;

        let data = self.data;
        let mut start = 0;
        let mut in_quotes = false;
        let mut in_comment = false;
        let mut escaped = false;

        for (i, &c) in data.iter().enumerate() {
            if in_comment {
                if c == b'\n' {
                    in_comment = false;
                }
                start = i + 1;
                continue;
            }

            if in_quotes {
                if escaped {
                    escaped = false;
                } else if c == b'\\' {
                    escaped = true;
                } else if c == b'"' {
                    in_quotes = false;
                }
                continue;
            }

            let kind = class(c);
            if kind == 0 {
                continue;
            }

            if kind & QUOTE != 0 {
                in_quotes = true;
                continue;
            }

            if start < i {
                state.push_scalar(start, i)?;
            }

            if kind & WHITESPACE != 0 {
                start = i + 1;
            } else if kind & PUNCTUATION != 0 {
                match c {
                    b'{' => state.open_group(i)?,
                    b'}' => state.close_group(i)?,
                    _ => state.equals(i)?,
                }
                start = i + 1;
            } else if kind & COMMENT != 0 {
                in_comment = true;
            }
        }

        // synthetic trailing newline closes the last scalar, even an
        // unterminated quoted one
        if !in_comment && start < data.len() {
            state.push_scalar(start, data.len())?;
        }

        if state.stack.len() > 1 {
            return Err(LexErrorKind::UnclosedGroup { offset: data.len() }.into());
        }

        state.push_token(TokenKind::CloseGroup, data.len())?;
        Ok(state.tape)
    }
}

struct TokenizerState<'a> {
    tape: TokenTape<'a>,
    stack: Vec<usize>,
    token_capacity: usize,
    node_capacity: usize,
}

impl<'a> TokenizerState<'a> {
    #[inline]
    fn push_token(&mut self, kind: TokenKind, offset: usize) -> Result<(), Error> {
        if self.tape.tokens.len() >= self.token_capacity {
            return Err(LexErrorKind::TokenCapacity { offset }.into());
        }

        self.tape.tokens.push(kind);
        Ok(())
    }

    #[inline]
    fn push_group(&mut self, offset: usize) -> Result<(), Error> {
        if self.tape.group_sizes.len() >= self.node_capacity {
            return Err(LexErrorKind::GroupCapacity { offset }.into());
        }

        self.tape.group_sizes.push(0);
        Ok(())
    }

    #[inline]
    fn current_group(&mut self) -> &mut i32 {
        let ind = self.stack[self.stack.len() - 1];
        &mut self.tape.group_sizes[ind]
    }

    #[inline]
    fn push_scalar(&mut self, start: usize, end: usize) -> Result<(), Error> {
        let span = &self.tape.data[start..end];
        let kind = if span.len() >= 2 && span[0] == b'"' && span[span.len() - 1] == b'"' {
            TokenKind::QuotedScalar
        } else {
            TokenKind::UnquotedScalar
        };

        if self.tape.scalar_offsets.len() >= self.node_capacity {
            return Err(LexErrorKind::ScalarCapacity { offset: start }.into());
        }

        let len = u32::try_from(span.len())
            .map_err(|_| Error::parse(start, "scalar longer than 4 GiB"))?;

        self.push_token(kind, start)?;
        self.tape.scalar_offsets.push(start);
        self.tape.scalar_lengths.push(len);
        *self.current_group() += 1;
        Ok(())
    }

    #[inline]
    fn open_group(&mut self, offset: usize) -> Result<(), Error> {
        self.push_token(TokenKind::OpenGroup, offset)?;
        *self.current_group() += 1;
        let ind = self.tape.group_sizes.len();
        self.push_group(offset)?;
        self.stack.push(ind);
        Ok(())
    }

    #[inline]
    fn close_group(&mut self, offset: usize) -> Result<(), Error> {
        if self.stack.len() <= 1 {
            return Err(LexErrorKind::UnmatchedClose { offset }.into());
        }

        self.push_token(TokenKind::CloseGroup, offset)?;
        self.stack.pop();
        Ok(())
    }

    #[inline]
    fn equals(&mut self, offset: usize) -> Result<(), Error> {
        self.push_token(TokenKind::Equals, offset)?;
        *self.current_group() -= 1;
        Ok(())
    }
}

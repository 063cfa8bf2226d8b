use crate::TdmsError;
use std::fmt;
use std::str::FromStr;

/// `ObjectPath` is the parsed form of a TDMS object path. The file object is `/`, a group is
/// `/'group'` and a channel is `/'group'/'channel'`, where a single quote inside a name is
/// doubled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectPath {
    Root,
    Group(String),
    Channel(String, String),
}

impl ObjectPath {
    pub fn group(group: &str) -> Self {
        ObjectPath::Group(group.to_string())
    }

    pub fn channel(group: &str, channel: &str) -> Self {
        ObjectPath::Channel(group.to_string(), channel.to_string())
    }

    pub fn group_name(&self) -> Option<&str> {
        match self {
            ObjectPath::Root => None,
            ObjectPath::Group(g) | ObjectPath::Channel(g, _) => Some(g.as_str()),
        }
    }

    pub fn channel_name(&self) -> Option<&str> {
        match self {
            ObjectPath::Channel(_, c) => Some(c.as_str()),
            _ => None,
        }
    }

    pub fn is_channel(&self) -> bool {
        matches!(self, ObjectPath::Channel(..))
    }
}

impl FromStr for ObjectPath {
    type Err = TdmsError;

    fn from_str(path: &str) -> Result<Self, TdmsError> {
        let invalid = || TdmsError::InvalidObjectPath(path.to_string());

        let mut rest = path.strip_prefix('/').ok_or_else(invalid)?;
        let mut components: Vec<String> = vec![];

        while !rest.is_empty() {
            let (component, remainder) = match rest.strip_prefix('\'') {
                Some(quoted) => split_quoted(quoted).ok_or_else(invalid)?,
                // some writers leave names unquoted
                None => match rest.find('/') {
                    Some(i) => (rest[..i].to_string(), &rest[i..]),
                    None => (rest.to_string(), ""),
                },
            };

            components.push(component);

            rest = match remainder.strip_prefix('/') {
                Some(r) if !r.is_empty() => r,
                Some(_) => return Err(invalid()),
                None if remainder.is_empty() => remainder,
                None => return Err(invalid()),
            };
        }

        let mut components = components.into_iter();
        match (components.next(), components.next(), components.next()) {
            (None, _, _) => Ok(ObjectPath::Root),
            (Some(g), None, _) => Ok(ObjectPath::Group(g)),
            (Some(g), Some(c), None) => Ok(ObjectPath::Channel(g, c)),
            _ => Err(invalid()),
        }
    }
}

/// splits `name'...` at the closing quote, unescaping doubled quotes along the way
fn split_quoted(s: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '\'' {
            name.push(c);
            continue;
        }

        match chars.peek() {
            Some((_, '\'')) => {
                name.push('\'');
                chars.next();
            }
            _ => return Some((name, &s[i + 1..])),
        }
    }

    None
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectPath::Root => write!(f, "/"),
            ObjectPath::Group(g) => write!(f, "/'{}'", g.replace('\'', "''")),
            ObjectPath::Channel(g, c) => write!(
                f,
                "/'{}'/'{}'",
                g.replace('\'', "''"),
                c.replace('\'', "''")
            ),
        }
    }
}

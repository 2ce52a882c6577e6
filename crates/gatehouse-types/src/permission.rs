use std::fmt;

/// Subject a permission applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    User(String),
    Any,
}

impl Role {
    pub fn user(id: impl Into<String>) -> Self {
        Role::User(id.into())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User(id) => write!(f, "user:{id}"),
            Role::Any => f.write_str("any"),
        }
    }
}

/// Access grant attached to a stored object, rendered as `read("user:ID")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Read(Role),
    Write(Role),
}

impl Permission {
    /// Read and write access scoped to a single user.
    pub fn owner(user_id: &str) -> Vec<Permission> {
        vec![
            Permission::Read(Role::user(user_id)),
            Permission::Write(Role::user(user_id)),
        ]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Read(role) => write!(f, "read(\"{role}\")"),
            Permission::Write(role) => write!(f, "write(\"{role}\")"),
        }
    }
}

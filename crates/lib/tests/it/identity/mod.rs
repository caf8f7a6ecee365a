//! Identity verbs on `SysDb`, grouped by what they touch.

mod allocation;
mod groups;
mod initgroups;
mod membership;
mod users;

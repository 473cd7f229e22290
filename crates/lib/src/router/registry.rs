//! Operation registry: the tree of menus and operations the shell navigates.
//!
//! Every node has a dotted coordinate (`0.1.9`) and a name (`equip`); both resolve
//! through this one table. Argument schemas live next to the operation they belong to.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Str,
    Int,
}

impl ArgKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDefault {
    Str(&'static str),
    Int(i64),
}

impl ArgDefault {
    pub fn to_value(self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::String(s.to_string()),
            Self::Int(n) => serde_json::Value::from(n),
        }
    }
}

/// One declared argument of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    /// Value injected when an optional argument is absent.
    pub default: Option<ArgDefault>,
}

const fn required(name: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        kind: ArgKind::Str,
        required: true,
        default: None,
    }
}

const fn optional(name: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        kind: ArgKind::Str,
        required: false,
        default: None,
    }
}

const fn optional_str(name: &'static str, default: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        kind: ArgKind::Str,
        required: false,
        default: Some(ArgDefault::Str(default)),
    }
}

const fn optional_int(name: &'static str, default: i64) -> ArgSpec {
    ArgSpec {
        name,
        kind: ArgKind::Int,
        required: false,
        default: Some(ArgDefault::Int(default)),
    }
}

/// Which collaborator executes an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Catalog,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub coordinate: &'static str,
    pub family: Family,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuSpec {
    pub name: &'static str,
    pub coordinate: &'static str,
    pub title: &'static str,
}

/// A resolved position in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Menu(&'static MenuSpec),
    Operation(&'static OperationSpec),
}

impl Node {
    pub fn coordinate(self) -> &'static str {
        match self {
            Self::Menu(m) => m.coordinate,
            Self::Operation(o) => o.coordinate,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Menu(m) => m.name,
            Self::Operation(o) => o.name,
        }
    }
}

pub const ROOT: &str = "0";

static MENUS: [MenuSpec; 3] = [
    MenuSpec {
        name: "skill_manager",
        coordinate: "0",
        title: "Skill Manager - three-tier skill architecture: global catalog, equipped state, skillsets",
    },
    MenuSpec {
        name: "skills",
        coordinate: "0.1",
        title: "Skills, equipped state, skillsets, and personas",
    },
    MenuSpec {
        name: "dashboard",
        coordinate: "0.2",
        title: "Dashboard: favorites, recents, and issues",
    },
];

static OPERATIONS: [OperationSpec; 30] = [
    OperationSpec {
        name: "list_skills",
        coordinate: "0.1.1",
        family: Family::Catalog,
        description: "List all skills in global catalog.",
        args: &[],
    },
    OperationSpec {
        name: "list_domains",
        coordinate: "0.1.2",
        family: Family::Catalog,
        description: "List all available skill domains.",
        args: &[],
    },
    OperationSpec {
        name: "list_by_domain",
        coordinate: "0.1.3",
        family: Family::Catalog,
        description: "List all skills and skillsets in a domain.",
        args: &[required("domain")],
    },
    OperationSpec {
        name: "get_skill",
        coordinate: "0.1.4",
        family: Family::Catalog,
        description: "Get full content of a skill.",
        args: &[required("name")],
    },
    OperationSpec {
        name: "create_skill",
        coordinate: "0.1.5",
        family: Family::Catalog,
        description: "Create a skill in global catalog.",
        args: &[
            required("name"),
            required("domain"),
            required("content"),
            required("description"),
            optional("subdomain"),
        ],
    },
    OperationSpec {
        name: "search_skills",
        coordinate: "0.1.6",
        family: Family::Catalog,
        description: "Search skills and skillsets by keyword.",
        args: &[required("query"), optional_int("n_results", 5)],
    },
    OperationSpec {
        name: "list_equipped",
        coordinate: "0.1.7",
        family: Family::Catalog,
        description: "List currently equipped skills.",
        args: &[],
    },
    OperationSpec {
        name: "get_equipped_content",
        coordinate: "0.1.8",
        family: Family::Catalog,
        description: "Get full content of all equipped skills.",
        args: &[],
    },
    OperationSpec {
        name: "equip",
        coordinate: "0.1.9",
        family: Family::Catalog,
        description: "Equip a skill or skillset. Loads it into working memory.",
        args: &[required("name")],
    },
    OperationSpec {
        name: "unequip",
        coordinate: "0.1.10",
        family: Family::Catalog,
        description: "Unequip a skill.",
        args: &[required("name")],
    },
    OperationSpec {
        name: "unequip_all",
        coordinate: "0.1.11",
        family: Family::Catalog,
        description: "Clear all equipped skills.",
        args: &[],
    },
    OperationSpec {
        name: "list_skillsets",
        coordinate: "0.1.12",
        family: Family::Catalog,
        description: "List all skillsets.",
        args: &[],
    },
    OperationSpec {
        name: "create_skillset",
        coordinate: "0.1.13",
        family: Family::Catalog,
        description: "Create a skillset with domain. skills is comma-separated.",
        args: &[
            required("name"),
            required("domain"),
            required("description"),
            required("skills"),
            optional("subdomain"),
        ],
    },
    OperationSpec {
        name: "add_to_skillset",
        coordinate: "0.1.14",
        family: Family::Catalog,
        description: "Add a skill to a skillset.",
        args: &[required("skillset_name"), required("skill_name")],
    },
    OperationSpec {
        name: "match_skilllog",
        coordinate: "0.1.15",
        family: Family::Catalog,
        description: "Match a SkillLog prediction against catalog.",
        args: &[required("prediction")],
    },
    OperationSpec {
        name: "list_personas",
        coordinate: "0.1.16",
        family: Family::Catalog,
        description: "List all personas.",
        args: &[],
    },
    OperationSpec {
        name: "create_persona",
        coordinate: "0.1.17",
        family: Family::Catalog,
        description: "Create a persona bundling frame, MCP set, skillset, and identity.",
        args: &[
            required("name"),
            required("domain"),
            required("description"),
            required("frame"),
            optional("mcp_set"),
            optional("skillset"),
            optional("carton_identity"),
            optional("subdomain"),
        ],
    },
    OperationSpec {
        name: "equip_persona",
        coordinate: "0.1.18",
        family: Family::Catalog,
        description: "Equip a persona - loads frame, attempts skillset, reports MCP set needs.",
        args: &[required("name")],
    },
    OperationSpec {
        name: "get_active_persona",
        coordinate: "0.1.19",
        family: Family::Catalog,
        description: "Get the currently active persona.",
        args: &[],
    },
    OperationSpec {
        name: "deactivate_persona",
        coordinate: "0.1.20",
        family: Family::Catalog,
        description: "Deactivate current persona and unequip all skills.",
        args: &[],
    },
    OperationSpec {
        name: "fav_skills_list",
        coordinate: "0.2.1",
        family: Family::Dashboard,
        description: "List favorite skills grouped by category.",
        args: &[],
    },
    OperationSpec {
        name: "fav_skills_add",
        coordinate: "0.2.2",
        family: Family::Dashboard,
        description: "Add a skill to favorites under a category.",
        args: &[required("skill_name"), optional_str("category", "general")],
    },
    OperationSpec {
        name: "fav_skills_remove",
        coordinate: "0.2.3",
        family: Family::Dashboard,
        description: "Remove a skill from favorites.",
        args: &[required("skill_name")],
    },
    OperationSpec {
        name: "fav_personas_list",
        coordinate: "0.2.4",
        family: Family::Dashboard,
        description: "List favorite personas.",
        args: &[],
    },
    OperationSpec {
        name: "fav_personas_add",
        coordinate: "0.2.5",
        family: Family::Dashboard,
        description: "Add a persona to favorites.",
        args: &[required("persona_name")],
    },
    OperationSpec {
        name: "fav_personas_remove",
        coordinate: "0.2.6",
        family: Family::Dashboard,
        description: "Remove a persona from favorites.",
        args: &[required("persona_name")],
    },
    OperationSpec {
        name: "recently_made",
        coordinate: "0.2.7",
        family: Family::Dashboard,
        description: "Show recently created skills, skillsets, and personas.",
        args: &[optional_int("limit", 10)],
    },
    OperationSpec {
        name: "recently_equipped",
        coordinate: "0.2.8",
        family: Family::Dashboard,
        description: "Show recently equipped skills and personas.",
        args: &[optional_int("limit", 10)],
    },
    OperationSpec {
        name: "create_issue",
        coordinate: "0.2.9",
        family: Family::Dashboard,
        description: "Record an issue. tags is comma-separated.",
        args: &[required("title"), required("body"), optional_str("tags", "")],
    },
    OperationSpec {
        name: "review_issues",
        coordinate: "0.2.10",
        family: Family::Dashboard,
        description: "List issues, or show one issue in full when issue_id is given.",
        args: &[optional("issue_id")],
    },
];

pub struct OperationRegistry;

impl OperationRegistry {
    pub fn operations() -> &'static [OperationSpec] {
        &OPERATIONS
    }

    pub fn menus() -> &'static [MenuSpec] {
        &MENUS
    }

    pub fn root() -> Node {
        Node::Menu(&MENUS[0])
    }

    /// Resolve a name or coordinate to a node.
    pub fn resolve(id: &str) -> Option<Node> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        OPERATIONS
            .iter()
            .find(|o| o.name == id || o.coordinate == id)
            .map(Node::Operation)
            .or_else(|| {
                MENUS
                    .iter()
                    .find(|m| m.name == id || m.coordinate == id)
                    .map(Node::Menu)
            })
    }

    /// Direct children of a coordinate, menus first, in table order.
    pub fn children(coordinate: &str) -> Vec<Node> {
        let menus = MENUS
            .iter()
            .filter(|m| parent_of(m.coordinate) == Some(coordinate))
            .map(Node::Menu);
        let ops = OPERATIONS
            .iter()
            .filter(|o| parent_of(o.coordinate) == Some(coordinate))
            .map(Node::Operation);
        menus.chain(ops).collect()
    }

    /// Render the whole tree, marking the current position.
    pub fn render_tree(current: &str) -> String {
        let mut out = String::new();
        render_subtree(&mut out, Self::root(), 0, current);
        let here = Self::resolve(current).unwrap_or_else(Self::root);
        let _ = write!(out, "\nCurrent position: {} ({})", here.coordinate(), here.name());
        out
    }

    /// Render one node: a menu lists its children, an operation shows its arguments.
    pub fn render_node(node: Node) -> String {
        match node {
            Node::Menu(m) => {
                let mut out = format!("{} | {}\n{}\n", m.coordinate, m.name, m.title);
                for child in Self::children(m.coordinate) {
                    let _ = write!(out, "\n  {}", node_line(child));
                }
                out
            }
            Node::Operation(o) => {
                let mut out = format!("{} | {}\n{}\n", o.coordinate, o.name, o.description);
                if o.args.is_empty() {
                    out.push_str("Args: none\nRun: exec");
                } else {
                    let _ = write!(out, "Args: {}\nRun: exec {}", describe_args(o.args), example_args(o.args));
                }
                out
            }
        }
    }
}

fn parent_of(coordinate: &str) -> Option<&str> {
    coordinate.rsplit_once('.').map(|(parent, _)| parent)
}

fn node_line(node: Node) -> String {
    match node {
        Node::Menu(m) => format!("{} | {} - {}", m.coordinate, m.name, m.title),
        Node::Operation(o) => format!("{} | {} - {}", o.coordinate, o.name, o.description),
    }
}

fn render_subtree(out: &mut String, node: Node, depth: usize, current: &str) {
    let marker = if node.coordinate() == current { "* " } else { "  " };
    let _ = writeln!(out, "{}{}{}", "  ".repeat(depth), marker, node_line(node));
    if let Node::Menu(m) = node {
        for child in OperationRegistry::children(m.coordinate) {
            render_subtree(out, child, depth + 1, current);
        }
    }
}

pub fn describe_args(args: &[ArgSpec]) -> String {
    args.iter()
        .map(|a| match (a.required, a.default) {
            (true, _) => format!("{} ({})", a.name, a.kind.as_str()),
            (false, None) => format!("{} ({}, optional)", a.name, a.kind.as_str()),
            (false, Some(d)) => format!(
                "{} ({}, optional, default {})",
                a.name,
                a.kind.as_str(),
                d.to_value()
            ),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn example_args(args: &[ArgSpec]) -> String {
    let body = args
        .iter()
        .filter(|a| a.required)
        .map(|a| format!("\"{}\": \"...\"", a.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

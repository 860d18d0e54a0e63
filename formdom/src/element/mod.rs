mod node;

pub use node::Element;

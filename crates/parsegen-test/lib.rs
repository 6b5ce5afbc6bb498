#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod backend_equivalence;

mod support;

// Copyright (c) 2021 10x Genomics, Inc. All rights reserved.

use std::mem;

enum State<T> {
    Empty,
    Accumulating(Vec<T>),
}

/// Groups runs of consecutive items that `same_cluster` considers equal.
///
/// The input must already be sorted so that equal items are adjacent.  Errors from
/// the input are passed through and leave the buffered run in place.
pub struct ClusterBuilder<I, T, F> {
    input: I,
    same_cluster: F,
    state: State<T>,
}

impl<I, T, E, F> ClusterBuilder<I, T, F>
where
    I: Iterator<Item = Result<T, E>>,
    F: FnMut(&T, &T) -> bool,
{
    pub fn new(input: I, same_cluster: F) -> Self {
        ClusterBuilder {
            input,
            same_cluster,
            state: State::Empty,
        }
    }
}

impl<I, T, E, F> Iterator for ClusterBuilder<I, T, F>
where
    I: Iterator<Item = Result<T, E>>,
    F: FnMut(&T, &T) -> bool,
{
    type Item = Result<Vec<T>, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match self.input.next() {
                Some(Ok(item)) => item,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    return match mem::replace(&mut self.state, State::Empty) {
                        State::Empty => None,
                        State::Accumulating(cluster) => Some(Ok(cluster)),
                    };
                }
            };
            match &mut self.state {
                State::Empty => self.state = State::Accumulating(vec![item]),
                State::Accumulating(cluster) => {
                    if (self.same_cluster)(&cluster[cluster.len() - 1], &item) {
                        cluster.push(item);
                    } else {
                        return Some(Ok(mem::replace(cluster, vec![item])));
                    }
                }
            }
        }
    }
}

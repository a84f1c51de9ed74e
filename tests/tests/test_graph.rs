// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex, RwLock};

use weave::{DataFormat, Serializable, Weave};

#[derive(Serializable, Debug)]
struct Node {
    name: String,
    next: Option<Rc<RefCell<Node>>>,
}

#[derive(Serializable, Debug, PartialEq)]
struct Leaf {
    value: i32,
}

#[derive(Serializable, Debug)]
struct Holder {
    left: Rc<Leaf>,
    right: Rc<Leaf>,
}

#[derive(Serializable, Debug)]
struct Worker {
    id: u32,
    peer: Option<Arc<Mutex<Worker>>>,
}

#[derive(Serializable, Debug)]
struct Registry {
    entries: Vec<Arc<RwLock<Leaf>>>,
}

#[test]
fn self_cycle_comes_back_as_a_cycle() {
    let weave = Weave::default();
    let node = Rc::new(RefCell::new(Node {
        name: "loop".to_string(),
        next: None,
    }));
    node.borrow_mut().next = Some(node.clone());

    for format in [DataFormat::Binary, DataFormat::Json] {
        let bytes = weave.serialize(&node, format).unwrap();
        let back: Rc<RefCell<Node>> = weave.deserialize(&bytes, format).unwrap();
        assert_eq!(back.borrow().name, "loop");
        let next = back.borrow().next.clone().unwrap();
        assert!(Rc::ptr_eq(&back, &next), "{format:?}");
        // Break the cycle so the test does not leak.
        back.borrow_mut().next = None;
    }
    node.borrow_mut().next = None;
}

#[test]
fn two_node_cycle() {
    let weave = Weave::default();
    let a = Rc::new(RefCell::new(Node {
        name: "a".to_string(),
        next: None,
    }));
    let b = Rc::new(RefCell::new(Node {
        name: "b".to_string(),
        next: Some(a.clone()),
    }));
    a.borrow_mut().next = Some(b.clone());

    let nodes = weave.serialize_nodes(&a).unwrap();
    let report = weave.deserialize_nodes::<Rc<RefCell<Node>>>(&nodes).unwrap();
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    let a2 = report.value;
    let b2 = a2.borrow().next.clone().unwrap();
    assert_eq!(b2.borrow().name, "b");
    let back_to_a = b2.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&a2, &back_to_a));

    a2.borrow_mut().next = None;
    a.borrow_mut().next = None;
}

#[test]
fn shared_values_keep_identity() {
    let weave = Weave::default();
    let leaf = Rc::new(Leaf { value: 9 });
    let list = vec![leaf.clone(), leaf.clone(), Rc::new(Leaf { value: 9 })];

    let bytes = weave.serialize(&list, DataFormat::Binary).unwrap();
    let back: Vec<Rc<Leaf>> = weave.deserialize(&bytes, DataFormat::Binary).unwrap();
    assert_eq!(back.len(), 3);
    assert!(Rc::ptr_eq(&back[0], &back[1]));
    assert!(!Rc::ptr_eq(&back[0], &back[2]));
    assert_eq!(*back[2], Leaf { value: 9 });

    let holder = Holder {
        left: leaf.clone(),
        right: leaf,
    };
    let json = weave.serialize_json(&holder).unwrap();
    assert!(json.contains("$iref:"), "{json}");
    let back: Holder = weave.deserialize_json(&json).unwrap();
    assert!(Rc::ptr_eq(&back.left, &back.right));
}

#[test]
fn arc_mutex_cycles() {
    let weave = Weave::default();
    let first = Arc::new(Mutex::new(Worker { id: 1, peer: None }));
    let second = Arc::new(Mutex::new(Worker {
        id: 2,
        peer: Some(first.clone()),
    }));
    first.lock().unwrap().peer = Some(second.clone());

    let bytes = weave.serialize(&first, DataFormat::Binary).unwrap();
    let back: Arc<Mutex<Worker>> = weave.deserialize(&bytes, DataFormat::Binary).unwrap();
    let peer = back.lock().unwrap().peer.clone().unwrap();
    assert_eq!(peer.lock().unwrap().id, 2);
    let again = peer.lock().unwrap().peer.clone().unwrap();
    assert!(Arc::ptr_eq(&back, &again));

    back.lock().unwrap().peer = None;
    first.lock().unwrap().peer = None;
}

#[test]
fn rwlock_shells_are_shared() {
    let weave = Weave::default();
    let shared = Arc::new(RwLock::new(Leaf { value: 3 }));
    let registry = Registry {
        entries: vec![shared.clone(), shared, Arc::new(RwLock::new(Leaf { value: 4 }))],
    };
    let bytes = weave.serialize(&registry, DataFormat::Binary).unwrap();
    let back: Registry = weave.deserialize(&bytes, DataFormat::Binary).unwrap();
    assert!(Arc::ptr_eq(&back.entries[0], &back.entries[1]));
    back.entries[0].write().unwrap().value = 30;
    assert_eq!(back.entries[1].read().unwrap().value, 30);
    assert_eq!(back.entries[2].read().unwrap().value, 4);
}

#[test]
fn sessions_do_not_share_ids() {
    let weave = Weave::default();
    let leaf = Rc::new(Leaf { value: 1 });
    let first = weave.serialize(&vec![leaf.clone()], DataFormat::Binary).unwrap();
    let second = weave.serialize(&vec![leaf], DataFormat::Binary).unwrap();
    assert_eq!(first, second);
}

mod submit_test;
